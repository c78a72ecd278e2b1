//! The closed set of coating-chemistry categories a model may choose from.

/// Allowed `coating_type` labels, in the order they are shown to the model.
pub const COATING_CHOICES: &[&str] = &[
    "Epoxy (BPA)",
    "Epoxy (BPF)",
    "Polyester",
    "Acrylic",
    "PVC",
    "Polyolefin",
    "Oleoresin/Phenolic",
    "Hybrid",
    "BPA-Free (Unspecified)",
];

/// Bisphenol-based epoxy labels. Only these can fall into the BPA era.
pub const BISPHENOL_EPOXIES: &[&str] = &["Epoxy (BPA)", "Epoxy (BPF)"];

/// Whether `label` is one of [`COATING_CHOICES`]. Exact, case-sensitive match.
pub fn is_known_coating(label: &str) -> bool {
    COATING_CHOICES.contains(&label)
}
