use std::path::Path;

pub trait PathExt {
    /// Case-insensitive match of the file extension against `extensions`
    /// (given without the leading dot).
    fn has_extension_in(&self, extensions: &[String]) -> bool;
    fn is_swc_file(&self) -> bool;
}

impl PathExt for Path {
    fn has_extension_in(&self, extensions: &[String]) -> bool {
        match self.extension().and_then(|e| e.to_str()) {
            Some(ext) => extensions
                .iter()
                .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext)),
            None => false,
        }
    }

    fn is_swc_file(&self) -> bool {
        self.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("swc"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("cell.swc", true)]
    #[case("cell.SWC", true)]
    #[case("cell.asc", true)]
    #[case("cell.h5", false)]
    #[case("README", false)]
    #[case(".swc", false)]
    fn given_path_when_matching_extensions_then_ignores_case(
        #[case] path: &str,
        #[case] expected: bool,
    ) {
        let extensions = vec!["swc".to_string(), ".asc".to_string()];
        assert_eq!(Path::new(path).has_extension_in(&extensions), expected);
    }

    #[test]
    fn given_swc_path_when_checking_format_then_detects_swc() {
        assert!(Path::new("a/b/neuron.Swc").is_swc_file());
        assert!(!Path::new("a/b/neuron.asc").is_swc_file());
    }
}
