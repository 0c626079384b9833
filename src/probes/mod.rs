//! Link and text quality probes
//!
//! KPI checks reach the network and the spelling dictionary only through
//! the [`Probes`] they are handed, so tests can swap in fixed answers.

pub mod links;
pub mod text;

pub use links::{HttpProbe, LinkProbe, LinkStatus};
pub use text::{
    acronym_count, all_alphanumeric, contains_markup, has_bulletin_header, is_title_case,
    Speller, WordList,
};

/// The probes available to KPI checks
pub struct Probes {
    /// Link reachability
    pub links: Box<dyn LinkProbe>,
    /// Spelling
    pub speller: Box<dyn Speller>,
}

impl Probes {
    /// Bundle a link probe and a speller
    pub fn new(links: impl LinkProbe + 'static, speller: impl Speller + 'static) -> Self {
        Self {
            links: Box::new(links),
            speller: Box::new(speller),
        }
    }
}

impl std::fmt::Debug for Probes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Probes").finish_non_exhaustive()
    }
}
