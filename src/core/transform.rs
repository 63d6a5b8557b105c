use crate::domain::model::{CaseMapping, Record};
use crate::domain::ports::RecordTransformer;

/// Uppercases both name fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct UppercaseNames {
    mapping: CaseMapping,
}

impl UppercaseNames {
    pub fn new(mapping: CaseMapping) -> Self {
        Self { mapping }
    }

    fn apply(&self, value: &str) -> String {
        match self.mapping {
            CaseMapping::Ascii => value.to_ascii_uppercase(),
            CaseMapping::Unicode => value.to_uppercase(),
        }
    }
}

impl RecordTransformer for UppercaseNames {
    fn transform(&self, record: Record) -> Record {
        Record {
            first_name: self.apply(&record.first_name),
            last_name: self.apply(&record.last_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uppercases_both_fields() {
        let result = UppercaseNames::default().transform(Record::new("Jean", "Dupont"));
        assert_eq!(result, Record::new("JEAN", "DUPONT"));
    }

    #[test]
    fn test_transform_is_idempotent() {
        let transformer = UppercaseNames::default();
        let inputs = [
            Record::new("alice", "smith"),
            Record::new("", ""),
            Record::new("Zoë", "o'neil-ßtraße"),
            Record::new("ALREADY", "UPPER"),
        ];
        for input in inputs {
            let once = transformer.transform(input);
            let twice = transformer.transform(once.clone());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_ascii_mapping_leaves_non_ascii_untouched() {
        let ascii = UppercaseNames::new(CaseMapping::Ascii);
        let result = ascii.transform(Record::new("zoë", "çelik"));
        assert_eq!(result, Record::new("ZOë", "çELIK"));
    }

    #[test]
    fn test_unicode_mapping() {
        let result =
            UppercaseNames::new(CaseMapping::Unicode).transform(Record::new("zoë", "straße"));
        assert_eq!(result, Record::new("ZOË", "STRASSE"));
    }

    #[test]
    fn test_closures_are_transformers() {
        let reverse = |record: Record| Record::new(record.last_name, record.first_name);
        assert_eq!(
            reverse.transform(Record::new("a", "b")),
            Record::new("b", "a")
        );
    }
}
