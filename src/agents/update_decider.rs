use crate::agents::mod_scanner::LocalMod;
use crate::error::{Result, SyncError};
use crate::registry::{Mod, ModVersion};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Outcome of comparing an installed mod with the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    UpToDate,
    /// The newest release is newer than the installed archive.
    Upgrade,
    /// The newest release is older than the installed archive.
    Downgrade,
}

impl Decision {
    pub fn needs_update(&self, allow_downgrade: bool) -> bool {
        match self {
            Decision::UpToDate => false,
            Decision::Upgrade => true,
            Decision::Downgrade => allow_downgrade,
        }
    }
}

/// A local mod paired with its registry entry and the verdict.
#[derive(Debug, Clone)]
pub struct PlannedUpdate<'a> {
    pub local: &'a LocalMod,
    pub remote: &'a Mod,
    pub local_version: ModVersion,
    pub remote_version: ModVersion,
    pub decision: Decision,
}

/// UpdateDecider compares installed versions with the registry's newest release
pub struct UpdateDecider<'a> {
    index: &'a HashMap<String, Mod>,
}

impl<'a> UpdateDecider<'a> {
    pub fn new(index: &'a HashMap<String, Mod>) -> Self {
        Self { index }
    }

    /// Classify one local mod. Any version difference counts as a change,
    /// the direction is reported through [`Decision`].
    pub fn decide<'m>(&self, local: &'m LocalMod) -> Result<PlannedUpdate<'m>>
    where
        'a: 'm,
    {
        let local_version = ModVersion::parse(&local.version)?;
        let remote = self
            .index
            .get(&local.name)
            .ok_or_else(|| SyncError::ModNotFound(local.name.clone()))?;
        let remote_version = ModVersion::parse(&remote.newest_release()?.version)?;

        let decision = match remote_version.cmp(&local_version) {
            Ordering::Equal => Decision::UpToDate,
            Ordering::Greater => Decision::Upgrade,
            Ordering::Less => Decision::Downgrade,
        };

        Ok(PlannedUpdate {
            local,
            remote,
            local_version,
            remote_version,
            decision,
        })
    }
}
