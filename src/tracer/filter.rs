//! Filename filters deciding which frames produce snapshots

use crate::error::Result;
use glob::Pattern;

/// Include/exclude glob patterns over source filenames
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl FileFilter {
    /// Compile the patterns; an empty include list admits every file
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    pub fn allows(&self, filename: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|p| p.matches(filename));
        included && !self.exclude.iter().any(|p| p.matches(filename))
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| Pattern::new(p).map_err(Into::into))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_filter_allows_everything() {
        let filter = FileFilter::default();
        assert!(filter.allows("main.py"));
        assert!(filter.allows("/usr/lib/python3/json/encoder.py"));
    }

    #[test]
    fn test_include_and_exclude() {
        let filter = FileFilter::new(&patterns(&["src/*.py"]), &patterns(&["*_test.py"])).unwrap();
        assert!(filter.allows("src/app.py"));
        assert!(!filter.allows("lib/app.py"));
        assert!(!filter.allows("src/app_test.py"));
    }

    #[test]
    fn test_exclude_only() {
        let filter = FileFilter::new(&[], &patterns(&["/usr/**"])).unwrap();
        assert!(filter.allows("main.py"));
        assert!(!filter.allows("/usr/lib/python3/json/encoder.py"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(FileFilter::new(&patterns(&["["]), &[]).is_err());
    }
}
