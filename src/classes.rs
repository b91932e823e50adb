use std::fmt;

/// Class names of the cropscan-v3 model, indexed by class id.
pub const CLASS_NAMES: [&str; 6] = [
    "healthy",
    "bacterial",
    "fungal",
    "viral",
    "nutrient_stress",
    "other_disease",
];

/// A resolved class label: either a table entry, or a synthesized fallback
/// for an id the table does not cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassLabel {
    Known(&'static str),
    Fallback(u32),
}

/// Total over all class ids; an out-of-table id yields `Fallback`, never an
/// error.
pub fn class_label(class_id: u32) -> ClassLabel {
    match CLASS_NAMES.get(class_id as usize) {
        Some(name) => ClassLabel::Known(name),
        None => ClassLabel::Fallback(class_id),
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassLabel::Known(name) => f.write_str(name),
            ClassLabel::Fallback(id) => write!(f, "class_{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_ids_map_to_table_entries() {
        for (id, expected) in CLASS_NAMES.iter().enumerate() {
            let label = class_label(id as u32);
            assert_eq!(label, ClassLabel::Known(expected));
            assert_eq!(label.to_string(), *expected);
        }
    }

    #[test]
    fn test_out_of_table_ids_synthesize_fallback() {
        assert_eq!(class_label(6), ClassLabel::Fallback(6));
        assert_eq!(class_label(6).to_string(), "class_6");
        assert_eq!(class_label(42).to_string(), "class_42");
        assert_eq!(class_label(u32::MAX).to_string(), format!("class_{}", u32::MAX));
    }
}
