//! Blank APSAD R4 checklist.
//!
//! The template covers the yearly verification of portable and mobile
//! extinguishers. Every item starts unanswered; inspectors fill in `ok` or
//! `ko` and an optional comment.

use crate::inspection::{ChecklistItem, InspectionInput, Section, Status};

const SECTIONS: &[(&str, &[&str])] = &[
    (
        "Extincteurs",
        &[
            "Extincteur visible",
            "Extincteur accessible et non encombré",
            "Signalisation présente",
            "Consignes d'utilisation lisibles",
            "Hauteur de poignée inférieure à 1,20 m",
        ],
    ),
    (
        "État des appareils",
        &[
            "Scellé et goupille en place",
            "Manomètre dans la zone verte",
            "Absence de corrosion ou de choc",
            "Flexible et diffuseur en bon état",
            "Étiquette de vérification à jour",
        ],
    ),
    (
        "Adéquation aux risques",
        &[
            "Agent extincteur adapté aux classes de feu",
            "Un appareil pour 200 m² minimum",
            "Distance maximale de 15 m à parcourir",
            "Extincteur CO2 près des tableaux électriques",
        ],
    ),
    (
        "Registre de sécurité",
        &[
            "Registre présent sur site",
            "Dernière vérification annuelle consignée",
            "Actions correctives précédentes levées",
        ],
    ),
];

/// A fresh APSAD R4 checklist with every item unanswered.
#[must_use]
pub fn apsad_r4_template() -> InspectionInput {
    let sections = SECTIONS
        .iter()
        .map(|(title, questions)| {
            Section::new(
                *title,
                questions
                    .iter()
                    .map(|question| ChecklistItem::new(*question, Status::default()))
                    .collect(),
            )
        })
        .collect();
    InspectionInput::new("Vérification APSAD R4", sections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_shape() {
        let template = apsad_r4_template();
        assert_eq!(template.sections.len(), SECTIONS.len());
        assert_eq!(template.sections[0].title, "Extincteurs");
        assert_eq!(template.sections[0].items[0].question, "Extincteur visible");
    }

    #[test]
    fn test_template_items_unanswered() {
        let template = apsad_r4_template();
        assert!(template.items().all(|item| item.status == Status::default()));
        assert!(template.items().all(|item| item.comment.is_none()));
        assert_eq!(template.summary().conforming, 0);
    }

    #[test]
    fn test_template_roundtrips_as_json() {
        let template = apsad_r4_template();
        let json = serde_json::to_string_pretty(&template).unwrap();
        let parsed: InspectionInput = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, template);
    }
}
