//! Firmware version comparison.
//!
//! The sensor reports its firmware as dotted decimal text (e.g. `00.00.66`).
//! Comparison is numeric per component; missing or non-numeric components
//! count as zero, so `1.2` and `1.2.0` compare equal.

use std::cmp::Ordering;

/// A parsed firmware revision, ordered numerically by component.
#[derive(Debug, Clone)]
pub struct FirmwareVersion {
    components: Vec<u32>,
}

impl FirmwareVersion {
    /// Parse a revision string. Never fails: unparseable components are zero.
    pub fn new(text: &str) -> Self {
        let components = text
            .split(['.', '_', '-'])
            .map(|part| part.trim().parse::<u32>().unwrap_or(0))
            .collect();

        Self { components }
    }

    fn component(&self, index: usize) -> u32 {
        self.components.get(index).copied().unwrap_or(0)
    }
}

impl Ord for FirmwareVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            match self.component(i).cmp(&other.component(i)) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for FirmwareVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FirmwareVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FirmwareVersion {}

impl std::fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text: Vec<String> = self.components.iter().map(u32::to_string).collect();
        write!(f, "{}", text.join("."))
    }
}
