//! Identity Registry - Persistent Customer Identities
//!
//! ## Responsibilities
//!
//! - Single source of truth for "have we seen this person before"
//! - Mint monotonic, fixed-width ids for newly identified individuals
//! - Serve returning-customer lookups across cameras and sessions
//!
//! Person ids are never reused or re-bound once created. All mutation flows
//! through the identification path; an entry is inserted under one write
//! guard, so it is either fully absent or fully present to readers.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A previously-seen persistent identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownPerson {
    pub person_id: String,
    pub display_name: String,
    pub is_loyal_member: bool,
    pub first_seen: DateTime<Utc>,
}

/// Identity payload carried by an identification event
///
/// All fields are optional on the wire; `person_id` or `display_name`
/// presence is what marks an object update as an identification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityCandidate {
    pub person_id: Option<String>,
    pub display_name: Option<String>,
    pub confidence: Option<f64>,
    pub is_loyal_member: Option<bool>,
}

/// Outcome of resolving an identification candidate
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Candidate matched an existing entry; its attributes are reused
    Returning(KnownPerson),
    /// Candidate minted a new entry
    New(KnownPerson),
}

impl Resolution {
    /// The resolved person, regardless of outcome
    pub fn person(&self) -> &KnownPerson {
        match self {
            Resolution::Returning(person) => person,
            Resolution::New(person) => person,
        }
    }
}

struct RegistryInner {
    people: HashMap<String, KnownPerson>,
    next_serial: u64,
}

/// IdentityRegistry instance
pub struct IdentityRegistry {
    inner: RwLock<RegistryInner>,
}

impl IdentityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                people: HashMap::new(),
                next_serial: 0,
            }),
        }
    }

    /// Look up a person by id
    pub async fn lookup(&self, person_id: &str) -> Option<KnownPerson> {
        let inner = self.inner.read().await;
        inner.people.get(person_id).cloned()
    }

    /// Register a brand-new identity and return its person id
    pub async fn register_new(&self, display_name: &str, is_loyal_member: bool) -> String {
        let mut inner = self.inner.write().await;
        let person = mint(&mut inner, None, Some(display_name), is_loyal_member);
        tracing::info!(
            person_id = %person.person_id,
            display_name = %person.display_name,
            "New identity registered"
        );
        person.person_id
    }

    /// Resolve an identification candidate to a known person
    ///
    /// A candidate whose `person_id` is already registered resolves as
    /// returning; its stored attributes win over anything on the wire.
    /// Otherwise a new entry is minted, keeping a wire-assigned id when
    /// present so later sightings of it resolve as returning.
    pub async fn resolve(&self, candidate: &IdentityCandidate) -> Resolution {
        let mut inner = self.inner.write().await;

        if let Some(id) = candidate.person_id.as_deref() {
            if let Some(existing) = inner.people.get(id) {
                return Resolution::Returning(existing.clone());
            }
        }

        let person = mint(
            &mut inner,
            candidate.person_id.as_deref(),
            candidate.display_name.as_deref(),
            candidate.is_loyal_member.unwrap_or(false),
        );
        tracing::info!(
            person_id = %person.person_id,
            display_name = %person.display_name,
            "New identity registered"
        );
        Resolution::New(person)
    }

    /// Pick a uniformly random known person
    ///
    /// Used by the simulated channel and test fixtures to stage
    /// returning-customer sightings.
    pub async fn pick_random_known(&self) -> Option<KnownPerson> {
        let inner = self.inner.read().await;
        if inner.people.is_empty() {
            return None;
        }
        let idx = rand::thread_rng().gen_range(0..inner.people.len());
        inner.people.values().nth(idx).cloned()
    }

    /// Number of known people
    pub async fn count(&self) -> usize {
        let inner = self.inner.read().await;
        inner.people.len()
    }

    /// Clear all entries and the serial counter
    ///
    /// Test isolation; a live console never resets.
    pub async fn reset(&self) {
        let mut inner = self.inner.write().await;
        inner.people.clear();
        inner.next_serial = 0;
        tracing::debug!("Identity registry reset");
    }
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Insert a new entry under the caller's write guard
fn mint(
    inner: &mut RegistryInner,
    wire_id: Option<&str>,
    display_name: Option<&str>,
    is_loyal_member: bool,
) -> KnownPerson {
    inner.next_serial += 1;
    let serial = inner.next_serial;

    // Wire-assigned ids are kept verbatim so the backend's notion of the
    // person stays resolvable; synthesized labels come from the serial.
    let person_id = wire_id
        .map(str::to_string)
        .unwrap_or_else(|| format!("person-{:04}", serial));
    let display_name = display_name
        .map(str::to_string)
        .unwrap_or_else(|| format!("User-{:03}", serial));

    let person = KnownPerson {
        person_id: person_id.clone(),
        display_name,
        is_loyal_member,
        first_seen: Utc::now(),
    };
    inner.people.insert(person_id, person.clone());
    person
}
