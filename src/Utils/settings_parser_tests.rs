/////////////////////////////TESTS////////////////////////////////////////////////////
/*
document level tests:
Basic parsing test
Several sections test
Comments and empty document test
Repeated section test
Malformed document test
File-based parsing test
*/

#[cfg(test)]
mod tests1 {
    use crate::Utils::settings_parser::{Value, parse_document};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_single_section() {
        let document = parse_document("integral steps: 500 max_delta_steps: 2000").unwrap();
        let section = &document["integral"];
        assert_eq!(section["steps"], vec![Value::Integer(500)]);
        assert_eq!(section["max_delta_steps"], vec![Value::Integer(2000)]);
    }

    #[test]
    fn test_parse_several_sections() {
        let input = "integral\n  steps: 500\nevaluation\n  real_tolerance: 1e-9\n  fold_constants: false\nlogging loglevel: debug";
        let document = parse_document(input).unwrap();
        assert_eq!(document.len(), 3);
        assert_eq!(
            document["evaluation"]["real_tolerance"],
            vec![Value::Float(1e-9)]
        );
        assert_eq!(
            document["evaluation"]["fold_constants"],
            vec![Value::Boolean(false)]
        );
        assert_eq!(
            document["logging"]["loglevel"],
            vec![Value::String("debug".to_string())]
        );
    }

    #[test]
    fn test_comments_and_empty_document() {
        let input = "# settings for previews\n// integral section\nintegral\n steps: 50\n";
        let document = parse_document(input).unwrap();
        assert_eq!(document["integral"]["steps"], vec![Value::Integer(50)]);
        assert!(parse_document("").unwrap().is_empty());
        assert!(parse_document("# only a comment").unwrap().is_empty());
    }

    #[test]
    fn test_repeated_sections_are_merged() {
        let input = "integral steps: 10\nevaluation max_depth: 20\nintegral steps: 30 max_delta_steps: 40";
        let document = parse_document(input).unwrap();
        assert_eq!(document["integral"]["steps"], vec![Value::Integer(30)]);
        assert_eq!(document["integral"]["max_delta_steps"], vec![Value::Integer(40)]);
    }

    #[test]
    fn test_value_lists() {
        let document = parse_document("section values: 1, 2.5, true, word").unwrap();
        assert_eq!(
            document["section"]["values"],
            vec![
                Value::Integer(1),
                Value::Float(2.5),
                Value::Boolean(true),
                Value::String("word".to_string())
            ]
        );
    }

    #[test]
    fn test_malformed_document() {
        assert!(parse_document("integral steps 500").is_err());
        assert!(parse_document(": 500").is_err());
    }

    #[test]
    fn test_parse_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "integral").unwrap();
        writeln!(file, "  steps: 250").unwrap();
        let content = std::fs::read_to_string(file.path()).unwrap();
        let document = parse_document(&content).unwrap();
        assert_eq!(document["integral"]["steps"], vec![Value::Integer(250)]);
    }
}
