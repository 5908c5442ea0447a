//! Canonicalization table.
//!
//! Every field the merge logic knows about is a [`CanonicalField`]. Each
//! source spells the same attribute differently: the spreadsheet export
//! uses human headers (`"Name of the youth"`), the relational and
//! warehouse tables use snake_case columns (`youth_name`), and the UI
//! sends short labels (`"Name"`). [`ALIASES`] lists every known spelling
//! explicitly; lookups compare the trimmed, lowercased spelling.
//!
//! | Source | Example spelling | Canonical field |
//! |--------|------------------|-----------------|
//! | spreadsheet | `Telephone` | `Telephone` |
//! | relational / warehouse | `medical_id_number` | `Medical ID Number` |
//! | UI label | `ID Docs` | `Identification documents` |
//!
//! The table is immutable and built once; concurrent readers need no
//! synchronization.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Closed set of attributes surfaced to merge logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CanonicalField {
    YouthName,
    MedicalIdNumber,
    ActualReleaseDate,
    ScheduledAppointments,
    Housing,
    Employment,
    IncomeAndBenefits,
    FoodAndClothing,
    Transportation,
    IdentificationDocuments,
    LifeSkills,
    FamilyAndChildren,
    CourtDates,
    ServiceReferrals,
    HomeModifications,
    DurableMedicalEquipment,
    CaseNotes,
    RaceEthnicity,
    Telephone,
    ResidentialAddress,
    EmergencyContacts,
    MediCalHealthPlan,
    HealthScreenings,
    HealthAssessments,
    ChronicConditions,
    PrescribedMedications,
    ClinicalAssessments,
    Screenings,
    PrimaryPhysicianContacts,
    TreatmentHistory,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 30] = [
        CanonicalField::YouthName,
        CanonicalField::MedicalIdNumber,
        CanonicalField::ActualReleaseDate,
        CanonicalField::ScheduledAppointments,
        CanonicalField::Housing,
        CanonicalField::Employment,
        CanonicalField::IncomeAndBenefits,
        CanonicalField::FoodAndClothing,
        CanonicalField::Transportation,
        CanonicalField::IdentificationDocuments,
        CanonicalField::LifeSkills,
        CanonicalField::FamilyAndChildren,
        CanonicalField::CourtDates,
        CanonicalField::ServiceReferrals,
        CanonicalField::HomeModifications,
        CanonicalField::DurableMedicalEquipment,
        CanonicalField::CaseNotes,
        CanonicalField::RaceEthnicity,
        CanonicalField::Telephone,
        CanonicalField::ResidentialAddress,
        CanonicalField::EmergencyContacts,
        CanonicalField::MediCalHealthPlan,
        CanonicalField::HealthScreenings,
        CanonicalField::HealthAssessments,
        CanonicalField::ChronicConditions,
        CanonicalField::PrescribedMedications,
        CanonicalField::ClinicalAssessments,
        CanonicalField::Screenings,
        CanonicalField::PrimaryPhysicianContacts,
        CanonicalField::TreatmentHistory,
    ];

    /// The canonical spelling used as the merge and lookup key.
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::YouthName => "Name of the youth",
            CanonicalField::MedicalIdNumber => "Medical ID Number",
            CanonicalField::ActualReleaseDate => "Actual release date",
            CanonicalField::ScheduledAppointments => "Scheduled Appointments",
            CanonicalField::Housing => "Housing",
            CanonicalField::Employment => "Employment",
            CanonicalField::IncomeAndBenefits => "Income and benefits",
            CanonicalField::FoodAndClothing => "Food & Clothing",
            CanonicalField::Transportation => "Transportation",
            CanonicalField::IdentificationDocuments => "Identification documents",
            CanonicalField::LifeSkills => "Life skills",
            CanonicalField::FamilyAndChildren => "Family and children",
            CanonicalField::CourtDates => "Court dates",
            CanonicalField::ServiceReferrals => "Service referrals",
            CanonicalField::HomeModifications => "Home Modifications",
            CanonicalField::DurableMedicalEquipment => "Durable Medical Equipment",
            CanonicalField::CaseNotes => "Case Notes",
            CanonicalField::RaceEthnicity => "Race/Ethnicity",
            CanonicalField::Telephone => "Telephone",
            CanonicalField::ResidentialAddress => "Residential Address",
            CanonicalField::EmergencyContacts => "Emergency contacts",
            CanonicalField::MediCalHealthPlan => "Medi-Cal health plan assigned",
            CanonicalField::HealthScreenings => "Health Screenings",
            CanonicalField::HealthAssessments => "Health Assessments",
            CanonicalField::ChronicConditions => "Chronic Conditions",
            CanonicalField::PrescribedMedications => "Prescribed Medications",
            CanonicalField::ClinicalAssessments => "Clinical Assessments",
            CanonicalField::Screenings => "Screenings",
            CanonicalField::PrimaryPhysicianContacts => "Primary physician contacts",
            CanonicalField::TreatmentHistory => "Treatment History",
        }
    }

    /// Looks up a raw spelling (any source, any casing).
    pub fn lookup(raw: &str) -> Option<CanonicalField> {
        alias_index().get(&fold(raw)).copied()
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source-specific spellings. Canonical spellings are added to the index
/// automatically, so they are not repeated here.
pub static ALIASES: &[(&str, CanonicalField)] = &[
    // Relational and warehouse columns
    ("youth_name", CanonicalField::YouthName),
    ("medical_id_number", CanonicalField::MedicalIdNumber),
    ("actual_release_date", CanonicalField::ActualReleaseDate),
    ("scheduled_appointments", CanonicalField::ScheduledAppointments),
    ("housing", CanonicalField::Housing),
    ("employment", CanonicalField::Employment),
    ("income_and_benefits", CanonicalField::IncomeAndBenefits),
    ("food_and_clothing", CanonicalField::FoodAndClothing),
    ("transportation", CanonicalField::Transportation),
    ("identification_documents", CanonicalField::IdentificationDocuments),
    ("life_skills", CanonicalField::LifeSkills),
    ("family_and_children", CanonicalField::FamilyAndChildren),
    ("court_dates", CanonicalField::CourtDates),
    ("service_referrals", CanonicalField::ServiceReferrals),
    ("home_modifications", CanonicalField::HomeModifications),
    ("durable_medical_equipment", CanonicalField::DurableMedicalEquipment),
    ("case_notes", CanonicalField::CaseNotes),
    ("race_ethnicity", CanonicalField::RaceEthnicity),
    ("telephone", CanonicalField::Telephone),
    ("phone", CanonicalField::Telephone),
    ("phone_number", CanonicalField::Telephone),
    ("residential_address", CanonicalField::ResidentialAddress),
    ("address", CanonicalField::ResidentialAddress),
    ("emergency_contacts", CanonicalField::EmergencyContacts),
    ("medi_cal_id_number", CanonicalField::MedicalIdNumber),
    ("medi_cal_health_plan_assigned", CanonicalField::MediCalHealthPlan),
    ("health_screenings", CanonicalField::HealthScreenings),
    ("health_assessments", CanonicalField::HealthAssessments),
    ("chronic_conditions", CanonicalField::ChronicConditions),
    ("prescribed_medications", CanonicalField::PrescribedMedications),
    ("clinical_assessments", CanonicalField::ClinicalAssessments),
    ("screenings", CanonicalField::Screenings),
    ("primary_physician_contacts", CanonicalField::PrimaryPhysicianContacts),
    ("treatment_history", CanonicalField::TreatmentHistory),
    // Spreadsheet headers
    ("Phone Number", CanonicalField::Telephone),
    ("Medi-Cal ID Number", CanonicalField::MedicalIdNumber),
    (
        "Treatment History (mental health, physical health, substance use)",
        CanonicalField::TreatmentHistory,
    ),
    // UI labels
    ("Name", CanonicalField::YouthName),
    ("Medical ID", CanonicalField::MedicalIdNumber),
    ("Medi-Cal ID", CanonicalField::MedicalIdNumber),
    ("Release Date", CanonicalField::ActualReleaseDate),
    ("Appointments", CanonicalField::ScheduledAppointments),
    ("Income", CanonicalField::IncomeAndBenefits),
    ("ID Docs", CanonicalField::IdentificationDocuments),
    ("Family", CanonicalField::FamilyAndChildren),
    ("Durable Equipment", CanonicalField::DurableMedicalEquipment),
    ("Health Plan", CanonicalField::MediCalHealthPlan),
    ("Physician Contacts", CanonicalField::PrimaryPhysicianContacts),
];

fn fold(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn alias_index() -> &'static HashMap<String, CanonicalField> {
    static INDEX: OnceLock<HashMap<String, CanonicalField>> = OnceLock::new();
    INDEX.get_or_init(|| {
        let mut index = HashMap::with_capacity(ALIASES.len() + CanonicalField::ALL.len());
        for field in CanonicalField::ALL {
            index.insert(fold(field.as_str()), field);
        }
        for (alias, field) in ALIASES {
            index.entry(fold(alias)).or_insert(*field);
        }
        index
    })
}
