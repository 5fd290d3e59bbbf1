//! Article body recovery from Korean publisher pages.
//!
//! Given an article URL and the (possibly cut-off) body the issue feed
//! supplied, the crawler decides whether the live page is worth fetching and,
//! if so, pulls a clean body and headline out of it.
//!
//! | Stage | Module |
//! |-------|--------|
//! | Is the reference body cut off? | [`truncation`] |
//! | Which URLs might serve the same story? | [`candidates`] |
//! | GET and decode | [`fetch`] |
//! | Parse (strict, then repaired markup) | [`parser`] |
//! | Remove boilerplate subtrees | [`noise`] |
//! | Tiered body extraction | [`content`], [`jsonld`] |
//! | Line-level cleanup | [`cleanup`] |
//! | Headline and title comparison | [`title`] |
//! | Putting it together | [`orchestrator`] |
//!
//! All outlet-specific knowledge lives in [`publishers`].

pub mod candidates;
pub mod cleanup;
pub mod content;
pub mod error;
pub mod fetch;
pub mod jsonld;
pub mod noise;
pub mod orchestrator;
pub mod parser;
pub mod publishers;
pub mod title;
pub mod truncation;

use noise::NoiseRules;
use publishers::PublisherRegistry;

/// The read-only tables every extraction consults.
///
/// Built once at start-up and shared by reference.
#[derive(Debug, Clone, Default)]
pub struct ExtractionRules {
    pub publishers: PublisherRegistry,
    pub noise: NoiseRules,
}

impl ExtractionRules {
    pub fn new(publishers: PublisherRegistry, noise: NoiseRules) -> Self {
        Self { publishers, noise }
    }
}
