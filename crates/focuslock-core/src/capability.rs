//! Enforcement capabilities and the probe that reports them.
//!
//! The user can revoke any permission from outside the app at any moment, so
//! the capability set is never assumed static. It is probed before each
//! decision, optionally through a short-lived [`CachedProbe`] that is
//! invalidated on permission-change notifications.
//!
//! Probing is fail-closed: a capability whose status cannot be determined is
//! treated as absent. That weakens enforcement to a lower tier but never
//! disables it, since the overlay and forced re-foregrounding remain.

use std::{fmt, str::FromStr, time::Duration};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{env::Environment, error::ParseCapabilityError};

/// Default lifetime of a cached capability report.
pub const DEFAULT_PROBE_TTL: Duration = Duration::from_millis(500);

/// A single enforcement mechanism the host may grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// OS-level task pinning that makes foreground escape impossible.
    StrictKiosk,
    /// Navigation key events can be observed and consumed.
    InputInterception,
    /// A full-screen overlay can be drawn above other apps.
    OverlayDraw,
    /// The app holds device administrator privileges.
    DeviceAdmin,
}

impl Capability {
    /// Every capability, in declaration order.
    pub const ALL: [Self; 4] =
        [Self::StrictKiosk, Self::InputInterception, Self::OverlayDraw, Self::DeviceAdmin];

    /// Stable snake-case name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Self::StrictKiosk => "strict_kiosk",
            Self::InputInterception => "input_interception",
            Self::OverlayDraw => "overlay_draw",
            Self::DeviceAdmin => "device_admin",
        }
    }

    /// The single-member set holding this capability.
    pub const fn flag(self) -> CapabilitySet {
        match self {
            Self::StrictKiosk => CapabilitySet::STRICT_KIOSK,
            Self::InputInterception => CapabilitySet::INPUT_INTERCEPTION,
            Self::OverlayDraw => CapabilitySet::OVERLAY_DRAW,
            Self::DeviceAdmin => CapabilitySet::DEVICE_ADMIN,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Capability {
    type Err = ParseCapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|cap| cap.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseCapabilityError(s.to_string()))
    }
}

bitflags! {
    /// Set of currently available capabilities.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct CapabilitySet: u8 {
        /// [`Capability::StrictKiosk`]
        const STRICT_KIOSK = 0b0001;
        /// [`Capability::InputInterception`]
        const INPUT_INTERCEPTION = 0b0010;
        /// [`Capability::OverlayDraw`]
        const OVERLAY_DRAW = 0b0100;
        /// [`Capability::DeviceAdmin`]
        const DEVICE_ADMIN = 0b1000;
    }
}

impl CapabilitySet {
    /// This set plus `capability`.
    #[must_use]
    pub fn with(self, capability: Capability) -> Self {
        self | capability.flag()
    }

    /// True if `capability` is in the set.
    pub fn has(self, capability: Capability) -> bool {
        self.contains(capability.flag())
    }

    /// Number of available capabilities.
    pub fn len(self) -> usize {
        self.bits().count_ones() as usize
    }

    /// Members in declaration order.
    pub fn capabilities(self) -> impl Iterator<Item = Capability> {
        Capability::ALL.into_iter().filter(move |cap| self.has(*cap))
    }

    /// Strongest enforcement mechanism this set allows.
    pub fn tier(self) -> EnforcementTier {
        if self.contains(Self::STRICT_KIOSK) {
            EnforcementTier::Kiosk
        } else if self.contains(Self::INPUT_INTERCEPTION) {
            EnforcementTier::Interception
        } else if self.contains(Self::OVERLAY_DRAW) {
            EnforcementTier::Overlay
        } else {
            EnforcementTier::RestoreOnly
        }
    }

    /// True if the overlay may be used as a transient cover.
    ///
    /// Strict kiosk mode makes foreground escape impossible, so the overlay is
    /// reserved for devices where only weaker enforcement is available.
    pub fn overlay_cover_permitted(self) -> bool {
        self.contains(Self::OVERLAY_DRAW) && self.tier() < EnforcementTier::Kiosk
    }
}

impl Default for CapabilitySet {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Capability> for CapabilitySet {
    fn from(capability: Capability) -> Self {
        capability.flag()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

/// Confidence hierarchy of enforcement mechanisms, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnforcementTier {
    /// Only forced re-foregrounding after the fact.
    RestoreOnly,
    /// Re-foregrounding covered by the overlay.
    Overlay,
    /// Navigation keys are consumed before the OS sees them.
    Interception,
    /// OS-level pinning.
    Kiosk,
}

/// Status of one capability as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProbeStatus {
    /// The host granted the capability.
    Granted,
    /// The host denied or revoked the capability.
    Denied,
    /// The status could not be determined. Treated as absent.
    #[default]
    Unknown,
}

impl ProbeStatus {
    /// Convert a boolean host answer.
    pub fn from_granted(granted: bool) -> Self {
        if granted { Self::Granted } else { Self::Denied }
    }

    /// True only for [`ProbeStatus::Granted`].
    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }
}

/// Raw per-capability answers from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapabilityReport {
    /// Lock task permitted (or device owner).
    pub strict_kiosk: ProbeStatus,
    /// Accessibility service enabled.
    pub input_interception: ProbeStatus,
    /// Overlay permission granted.
    pub overlay_draw: ProbeStatus,
    /// Device administrator active.
    pub device_admin: ProbeStatus,
}

impl CapabilityReport {
    /// Report with every capability granted.
    pub fn all_granted() -> Self {
        Self::from_set(CapabilitySet::all())
    }

    /// Report that grants exactly `set` and denies the rest.
    pub fn from_set(set: CapabilitySet) -> Self {
        let mut report = Self::default();
        for capability in Capability::ALL {
            report.set(capability, ProbeStatus::from_granted(set.has(capability)));
        }
        report
    }

    /// Status of one capability.
    pub fn status(&self, capability: Capability) -> ProbeStatus {
        match capability {
            Capability::StrictKiosk => self.strict_kiosk,
            Capability::InputInterception => self.input_interception,
            Capability::OverlayDraw => self.overlay_draw,
            Capability::DeviceAdmin => self.device_admin,
        }
    }

    /// Overwrite the status of one capability.
    pub fn set(&mut self, capability: Capability, status: ProbeStatus) {
        let slot = match capability {
            Capability::StrictKiosk => &mut self.strict_kiosk,
            Capability::InputInterception => &mut self.input_interception,
            Capability::OverlayDraw => &mut self.overlay_draw,
            Capability::DeviceAdmin => &mut self.device_admin,
        };
        *slot = status;
    }

    /// Collapse to a set. Unknown statuses count as absent.
    pub fn to_set(&self) -> CapabilitySet {
        Capability::ALL.into_iter().filter(|cap| self.status(*cap).is_granted()).collect()
    }
}

/// Source of capability information.
///
/// Implementations MUST NOT block. A host query that would block should
/// answer [`ProbeStatus::Unknown`] instead.
pub trait CapabilityProbe {
    /// Query the host for the status of every capability.
    fn probe(&mut self) -> CapabilityReport;

    /// Capabilities available for the next decision.
    fn current_capabilities(&mut self) -> CapabilitySet {
        self.probe().to_set()
    }

    /// Drop any cached answer. Called on permission-change notifications.
    fn invalidate(&mut self) {}
}

/// Capability cache configuration.
#[derive(Debug, Clone)]
pub struct ProbeCacheConfig {
    /// Maximum age of a cached report. Zero disables caching.
    pub ttl: Duration,
}

impl Default for ProbeCacheConfig {
    fn default() -> Self {
        Self { ttl: DEFAULT_PROBE_TTL }
    }
}

/// Short-lived cache in front of a slower probe.
pub struct CachedProbe<P, E: Environment> {
    inner: P,
    env: E,
    config: ProbeCacheConfig,
    cached: Option<(E::Instant, CapabilityReport)>,
}

impl<P: CapabilityProbe, E: Environment> CachedProbe<P, E> {
    /// Wrap `inner` with a cache driven by `env`'s clock.
    pub fn new(inner: P, env: E, config: ProbeCacheConfig) -> Self {
        Self { inner, env, config, cached: None }
    }

    /// The wrapped probe.
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Mutable access to the wrapped probe.
    pub fn inner_mut(&mut self) -> &mut P {
        &mut self.inner
    }

    /// True if a report is cached, regardless of age.
    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }
}

impl<P: CapabilityProbe, E: Environment> CapabilityProbe for CachedProbe<P, E> {
    fn probe(&mut self) -> CapabilityReport {
        let now = self.env.now();
        if let Some((at, report)) = self.cached
            && now - at < self.config.ttl
        {
            return report;
        }

        let report = self.inner.probe();
        self.cached = Some((now, report));
        report
    }

    fn invalidate(&mut self) {
        tracing::debug!("capability cache invalidated");
        self.cached = None;
        self.inner.invalidate();
    }
}
