use std::cmp::Ordering;
use std::fmt::{self, Display};

use log::debug;
use serde::Serialize;

use give_core::models::Reference;

use crate::errors::{TrackError, TrackResult};
use crate::track::Track;

///
/// Vertical area of a view window a track is drawn in, listed from top to
/// bottom.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Top,
    Scroll,
    Bottom,
    /// Between two view windows, used by tracks spanning both.
    InBetween,
}

impl Slot {
    pub const ALL: [Slot; 4] = [Slot::Top, Slot::Scroll, Slot::Bottom, Slot::InBetween];

    /// Slot named by a `pin` setting. Anything unrecognized scrolls.
    pub fn from_pin(pin: Option<&str>) -> Self {
        match pin.map(|pin| pin.trim().to_lowercase()).as_deref() {
            Some("top") => Slot::Top,
            Some("bottom") => Slot::Bottom,
            Some("inbetween") => Slot::InBetween,
            _ => Slot::Scroll,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Slot::Top => "top",
            Slot::Scroll => "scroll",
            Slot::Bottom => "bottom",
            Slot::InBetween => "inbetween",
        }
    }
}

impl Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

///
/// Final position of a track: its slot, then its rank inside the slot.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EffectivePriority {
    pub slot: Slot,
    pub index: usize,
}

///
/// Lexicographic comparison of `[group, track]` priorities.
///
pub fn compare_priorities(a: &[f64; 2], b: &[f64; 2]) -> Ordering {
    a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1]))
}

///
/// Keeps the vertical order of the tracks shown for one reference.
///
/// The initial order comes from track priorities. Afterwards tracks are only
/// appended, removed or moved explicitly, so adding a track never shifts the
/// relative order of the others.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriorityManager {
    slots: [Vec<String>; 4],
}

impl PriorityManager {
    ///
    /// Order the visible `tracks` by priority (ties keep their input order)
    /// and distribute them over the slots named by their `pin` settings.
    ///
    pub fn new<'a, I>(tracks: I, reference: &Reference) -> Self
    where
        I: IntoIterator<Item = &'a Track>,
    {
        let mut ranked: Vec<([f64; 2], &Track)> = tracks
            .into_iter()
            .filter(|track| track.is_visible())
            .map(|track| (track.priorities(reference), track))
            .collect();
        ranked.sort_by(|(a, _), (b, _)| compare_priorities(a, b));

        let mut manager = PriorityManager::default();
        for (_, track) in ranked {
            manager.add_track(track);
        }
        manager
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Vec<String> {
        &mut self.slots[slot as usize]
    }

    pub fn slot_ids(&self, slot: Slot) -> &[String] {
        &self.slots[slot as usize]
    }

    pub fn len(&self) -> usize {
        self.slots.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.effective_priority(id).is_some()
    }

    ///
    /// Append `track` to the end of its slot. A track already listed keeps
    /// its position.
    ///
    pub fn add_track(&mut self, track: &Track) -> EffectivePriority {
        if let Some(existing) = self.effective_priority(track.id()) {
            return existing;
        }
        let slot = Slot::from_pin(track.pin().as_deref());
        let ids = self.slot_mut(slot);
        ids.push(track.id().to_string());
        debug!("Track '{}' added to slot {}", track.id(), slot);
        EffectivePriority {
            slot,
            index: ids.len() - 1,
        }
    }

    pub fn remove_track(&mut self, id: &str) -> Option<EffectivePriority> {
        let position = self.effective_priority(id)?;
        self.slot_mut(position.slot).remove(position.index);
        Some(position)
    }

    ///
    /// Move a listed track to `index` of `slot` (clamped to the end of the
    /// slot).
    ///
    pub fn move_track(&mut self, id: &str, slot: Slot, index: usize) -> TrackResult<EffectivePriority> {
        self.remove_track(id)
            .ok_or_else(|| TrackError::UnknownTrack(id.to_string()))?;
        let ids = self.slot_mut(slot);
        let index = index.min(ids.len());
        ids.insert(index, id.to_string());
        Ok(EffectivePriority { slot, index })
    }

    pub fn effective_priority(&self, id: &str) -> Option<EffectivePriority> {
        Slot::ALL.into_iter().find_map(|slot| {
            self.slot_ids(slot)
                .iter()
                .position(|listed| listed == id)
                .map(|index| EffectivePriority { slot, index })
        })
    }

    ///
    /// All listed track IDs from top to bottom. The last window of a view
    /// stacks its tracks `reversed`.
    ///
    pub fn ordered_ids(&self, reversed: bool) -> Vec<&str> {
        let mut ids: Vec<&str> = self.slots.iter().flatten().map(String::as_str).collect();
        if reversed {
            ids.reverse();
        }
        ids
    }
}
