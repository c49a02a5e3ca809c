//! Scripted host runtime
//!
//! [`SimHost`] plays a small program described as a list of [`Step`]s and
//! delivers events the way an interpreter with a per-frame trace function
//! does: `call` goes to the hook whenever instrumentation is on, while `line`,
//! `opcode`, `return` and `exception` only reach frames whose trace flags ask
//! for them. It backs the crate's tests and demo.

use super::{Instrumentation, LiveFrame, TraceEvent, TraceHook, TraceSwitch};
use crate::error::{Result, TraceError};
use crate::frame::{Code, CodeId, TraceFlags};
use crate::value::{Heap, ObjectId, Value};
use std::collections::HashMap;
use tracing::warn;

/// A frame executing in the scripted host
#[derive(Debug, Clone)]
pub struct SimFrame {
    code_id: CodeId,
    code: Code,
    locals: Vec<(String, Value)>,
    lasti: u32,
    lineno: u32,
    flags: TraceFlags,
}

impl SimFrame {
    pub fn new(code_id: CodeId, code: Code) -> Self {
        let lineno = code.first_line;
        Self {
            code_id,
            code,
            locals: Vec::new(),
            lasti: 0,
            lineno,
            flags: TraceFlags::default(),
        }
    }

    /// Bind or rebind a local name
    pub fn assign(&mut self, name: &str, value: Value) {
        match self.locals.iter_mut().find(|(k, _)| k == name) {
            Some((_, slot)) => *slot = value,
            None => self.locals.push((name.to_string(), value)),
        }
    }

    pub fn goto_line(&mut self, lineno: u32) {
        self.lineno = lineno;
        self.lasti += 2;
    }

    fn wants(&self, event: TraceEvent) -> bool {
        match event {
            TraceEvent::Call => true,
            TraceEvent::Line => self.flags.lines,
            TraceEvent::Opcode => self.flags.opcodes,
            TraceEvent::Return | TraceEvent::Exception => self.flags.lines || self.flags.opcodes,
        }
    }
}

impl LiveFrame for SimFrame {
    fn code_id(&self) -> CodeId {
        self.code_id
    }

    fn describe_code(&self) -> Code {
        self.code.clone()
    }

    fn locals(&self) -> Vec<(String, Value)> {
        self.locals.clone()
    }

    fn lasti(&self) -> u32 {
        self.lasti
    }

    fn lineno(&self) -> u32 {
        self.lineno
    }

    fn trace_flags(&self) -> TraceFlags {
        self.flags
    }

    fn set_trace_flags(&mut self, flags: TraceFlags) {
        self.flags = flags;
    }
}

/// One instruction of a scripted program
#[derive(Debug, Clone)]
pub enum Step {
    /// Enter a new frame running a defined code unit
    Call(CodeId),
    /// Move the top frame to a source line
    Line(u32),
    /// Bind a local in the top frame (no event)
    Assign(String, Value),
    /// Mutate an object attribute on the heap (no event)
    SetAttr(ObjectId, String, Value),
    /// Leave the top frame with a value
    Return(Value),
    /// Raise inside the top frame without unwinding it
    Raise(Value),
    /// Execute one instruction in the top frame
    Opcode,
}

impl Step {
    pub fn assign(name: &str, value: impl Into<Value>) -> Self {
        Step::Assign(name.to_string(), value.into())
    }
}

/// Scripted interpreter delivering events to a [`TraceHook`]
pub struct SimHost {
    heap: Heap,
    stack: Vec<SimFrame>,
    codes: HashMap<CodeId, Code>,
    switch: TraceSwitch,
}

impl SimHost {
    /// Create a host whose root frame runs `<module>` in `main.py`
    pub fn new(switch: TraceSwitch) -> Self {
        Self::with_root(switch, Code::new("<module>", "main.py", 1))
    }

    /// Create a host with a custom root code unit
    ///
    /// The root frame starts with line tracing requested, the way a tracer
    /// that is enabled mid-program arms the frame that enabled it.
    pub fn with_root(switch: TraceSwitch, root: Code) -> Self {
        let root_id = CodeId(0);
        let mut frame = SimFrame::new(root_id, root.clone());
        frame.set_trace_flags(TraceFlags {
            lines: true,
            opcodes: false,
        });

        let mut codes = HashMap::new();
        codes.insert(root_id, root);

        Self {
            heap: Heap::new(),
            stack: vec![frame],
            codes,
            switch,
        }
    }

    /// Register a code unit that `Step::Call` can enter
    pub fn define(&mut self, code: Code) -> CodeId {
        let id = CodeId(self.codes.len() as u64);
        self.codes.insert(id, code);
        id
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub fn switch(&self) -> &TraceSwitch {
        &self.switch
    }

    /// Number of frames on the host stack, root included
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Play the steps, delivering events to `hook` while instrumentation is on
    ///
    /// Fatal hook errors stop the program and are returned; other hook errors
    /// are logged and the program keeps running.
    pub fn run(&mut self, steps: &[Step], hook: &mut dyn TraceHook) -> Result<()> {
        for step in steps {
            match step {
                Step::Call(code_id) => {
                    let code = self.codes.get(code_id).cloned().ok_or_else(|| {
                        TraceError::Host(format!("undefined code unit {}", code_id.0))
                    })?;
                    self.stack.push(SimFrame::new(*code_id, code));
                    self.deliver(hook, TraceEvent::Call, None)?;
                }
                Step::Line(lineno) => {
                    self.top()?.goto_line(*lineno);
                    self.deliver(hook, TraceEvent::Line, None)?;
                }
                Step::Assign(name, value) => self.top()?.assign(name, value.clone()),
                Step::SetAttr(target, name, value) => {
                    if !self.heap.set_attr(*target, name, value.clone()) {
                        return Err(TraceError::Host(format!("object {target} has no attributes")));
                    }
                }
                Step::Return(value) => {
                    self.deliver(hook, TraceEvent::Return, Some(value))?;
                    self.stack.pop();
                }
                Step::Raise(value) => self.deliver(hook, TraceEvent::Exception, Some(value))?,
                Step::Opcode => {
                    self.top()?.lasti += 2;
                    self.deliver(hook, TraceEvent::Opcode, None)?;
                }
            }
        }
        Ok(())
    }

    fn top(&mut self) -> Result<&mut SimFrame> {
        self.stack
            .last_mut()
            .ok_or_else(|| TraceError::Host("no frame is executing".to_string()))
    }

    fn deliver(
        &mut self,
        hook: &mut dyn TraceHook,
        event: TraceEvent,
        arg: Option<&Value>,
    ) -> Result<()> {
        if !self.switch.is_enabled() {
            return Ok(());
        }

        let frame = self
            .stack
            .last_mut()
            .ok_or_else(|| TraceError::Host("no frame is executing".to_string()))?;
        if !frame.wants(event) {
            return Ok(());
        }

        match hook.on_event(&self.heap, frame, event, arg) {
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(error = %e, %event, "Trace hook failed, continuing");
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }
}
