//! Option catalog: categories, revision bounds and requires/conflicts edges.
//!
//! The [`Registry`] is built once at startup (from the built-in table or a
//! TOML catalog), validated, and then only read. Its order is significant:
//! it is the serialization order of enabled options.

pub mod catalog;
mod graph;
pub mod revision;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::RegistryError;

pub use revision::DeviceRevision;

/// Partition of options; each category owns one tracked key in the uEnv file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Pin-muxing and bus options, stored under `interface=`.
    Interface,
    /// Add-on peripheral drivers, stored under `ext=`.
    Extension,
}

impl Category {
    /// Both categories in file order.
    pub const ALL: [Self; 2] = [Self::Interface, Self::Extension];

    /// Name of the tracked key in the uEnv file.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Interface => "interface",
            Self::Extension => "ext",
        }
    }

    /// Literal prefix that introduces the tracked line (`key=`).
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Interface => "interface=",
            Self::Extension => "ext=",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Category {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interface" | "interfaces" => Ok(Self::Interface),
            "ext" | "extension" | "extensions" => Ok(Self::Extension),
            _ => Err(RegistryError::UnknownCategory(s.trim().to_string())),
        }
    }
}

/// Unresolved option definition, as written in a catalog.
///
/// References are identifiers; [`Registry::from_defs`] resolves them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDef {
    /// Token written into the uEnv file.
    pub id: String,
    /// Category (and therefore tracked key) of the option.
    pub category: Category,
    /// Display label; defaults to the identifier.
    pub title: String,
    /// Help text shown when confirming.
    pub help: String,
    /// Inclusive lower revision rank; `None` means unbounded.
    pub min_rank: Option<u8>,
    /// Inclusive upper revision rank; `None` means unbounded.
    pub max_rank: Option<u8>,
    /// Identifiers that must be enabled alongside this option.
    pub requires: Vec<String>,
    /// Identifiers that cannot be enabled alongside this option.
    pub conflicts: Vec<String>,
}

impl ItemDef {
    /// Start a definition with no bounds and no edges.
    #[must_use]
    pub fn new(id: &str, category: Category, help: &str) -> Self {
        Self {
            id: id.to_string(),
            category,
            title: id.to_string(),
            help: help.to_string(),
            min_rank: None,
            max_rank: None,
            requires: Vec::new(),
            conflicts: Vec::new(),
        }
    }

    /// Only available from this revision onwards.
    #[must_use]
    pub fn since(mut self, revision: DeviceRevision) -> Self {
        self.min_rank = revision.rank();
        self
    }

    /// Only available up to and including this revision.
    #[must_use]
    pub fn until(mut self, revision: DeviceRevision) -> Self {
        self.max_rank = revision.rank();
        self
    }

    /// Add `requires` edges.
    #[must_use]
    pub fn requires(mut self, ids: &[&str]) -> Self {
        self.requires.extend(ids.iter().map(ToString::to_string));
        self
    }

    /// Add `conflicts` edges.
    #[must_use]
    pub fn conflicts(mut self, ids: &[&str]) -> Self {
        self.conflicts.extend(ids.iter().map(ToString::to_string));
        self
    }
}

/// A validated registry entry with resolved edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigItem {
    /// Token written into the uEnv file.
    pub id: String,
    /// Category (and therefore tracked key) of the option.
    pub category: Category,
    /// Display label.
    pub title: String,
    /// Help text shown when confirming.
    pub help: String,
    /// Inclusive lower revision rank; `None` means unbounded.
    pub min_rank: Option<u8>,
    /// Inclusive upper revision rank; `None` means unbounded.
    pub max_rank: Option<u8>,
    requires: Vec<usize>,
    conflicts: Vec<usize>,
}

impl ConfigItem {
    /// Registry indices this option depends on directly.
    #[must_use]
    pub fn requires(&self) -> &[usize] {
        &self.requires
    }

    /// Registry indices this option lists as conflicting.
    ///
    /// See [`Registry::conflicts_of`] for the undirected view.
    #[must_use]
    pub fn declared_conflicts(&self) -> &[usize] {
        &self.conflicts
    }

    /// Whether the option may be enabled on `revision`.
    #[must_use]
    pub fn is_available(&self, revision: DeviceRevision) -> bool {
        is_available(self, revision)
    }
}

/// Whether `item` may be enabled on `revision`.
///
/// True iff the revision is recognised and its rank lies within the item's
/// inclusive bounds. Recomputed on every call.
///
/// # Examples
///
/// ```
/// use epass_config::registry::{self, DeviceRevision};
///
/// let reg = registry::load_registry().unwrap();
/// let i2s = reg.get(reg.find("i2s0_pa").unwrap()).unwrap();
/// assert!(!registry::is_available(i2s, DeviceRevision::V0_3_4));
/// assert!(registry::is_available(i2s, DeviceRevision::V0_5));
/// ```
#[must_use]
pub fn is_available(item: &ConfigItem, revision: DeviceRevision) -> bool {
    let Some(rank) = revision.rank() else {
        return false;
    };
    item.min_rank.is_none_or(|min| rank >= min) && item.max_rank.is_none_or(|max| rank <= max)
}

/// Ordered, validated option catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    items: Vec<ConfigItem>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Build the registry shipped with the tool.
    ///
    /// # Errors
    ///
    /// Returns an error only if the built-in table is malformed.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_defs(builtin_defs())
    }

    /// Validate definitions and resolve their references.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateId`] for repeated identifiers,
    /// [`RegistryError::UnknownReference`] for dangling edges and
    /// [`RegistryError::DependencyCycle`] when the requires graph is cyclic.
    pub fn from_defs(defs: Vec<ItemDef>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(defs.len());
        for (i, def) in defs.iter().enumerate() {
            if index.insert(def.id.clone(), i).is_some() {
                return Err(RegistryError::DuplicateId(def.id.clone()));
            }
        }

        let resolve = |owner: &str, ids: &[String]| -> Result<Vec<usize>, RegistryError> {
            let mut out = Vec::with_capacity(ids.len());
            for id in ids {
                let idx = index
                    .get(id)
                    .copied()
                    .ok_or_else(|| RegistryError::UnknownReference {
                        option: owner.to_string(),
                        reference: id.clone(),
                    })?;
                if !out.contains(&idx) {
                    out.push(idx);
                }
            }
            Ok(out)
        };

        let mut items = Vec::with_capacity(defs.len());
        for def in &defs {
            let requires = resolve(&def.id, &def.requires)?;
            let conflicts = resolve(&def.id, &def.conflicts)?;
            items.push(ConfigItem {
                id: def.id.clone(),
                category: def.category,
                title: def.title.clone(),
                help: def.help.clone(),
                min_rank: def.min_rank,
                max_rank: def.max_rank,
                requires,
                conflicts,
            });
        }

        let requires: Vec<Vec<usize>> = items.iter().map(|i| i.requires.clone()).collect();
        let cyclic = graph::unorderable_nodes(&requires);
        if !cyclic.is_empty() {
            let names: Vec<&str> = cyclic
                .iter()
                .filter_map(|&i| items.get(i).map(|it| it.id.as_str()))
                .collect();
            return Err(RegistryError::DependencyCycle(names.join(", ")));
        }

        tracing::debug!(options = items.len(), "registry loaded");
        Ok(Self { items, index })
    }

    /// All options in registry order.
    #[must_use]
    pub fn items(&self) -> &[ConfigItem] {
        &self.items
    }

    /// Number of options.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the registry has no options.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Option at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ConfigItem> {
        self.items.get(index)
    }

    /// Registry index of the option with identifier `id`.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Registry index of `id`, only if it belongs to `category`.
    #[must_use]
    pub fn find_in(&self, id: &str, category: Category) -> Option<usize> {
        self.find(id)
            .filter(|&i| self.items.get(i).is_some_and(|it| it.category == category))
    }

    /// Options of one category with their registry indices, in registry order.
    pub fn in_category(&self, category: Category) -> impl Iterator<Item = (usize, &ConfigItem)> {
        self.items
            .iter()
            .enumerate()
            .filter(move |(_, it)| it.category == category)
    }

    /// Options that conflict with `index`, in registry order.
    ///
    /// Conflict edges are undirected: an option conflicts with everything it
    /// lists and with everything that lists it.
    #[must_use]
    pub fn conflicts_of(&self, index: usize) -> Vec<usize> {
        let declared = self
            .items
            .get(index)
            .map_or(&[][..], |it| it.conflicts.as_slice());
        (0..self.items.len())
            .filter(|&other| other != index)
            .filter(|&other| {
                declared.contains(&other)
                    || self
                        .items
                        .get(other)
                        .is_some_and(|it| it.conflicts.contains(&index))
            })
            .collect()
    }

    /// Transitive dependencies of `index` in depth-first pre-order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DependencyCycle`] if a cycle is reached.
    pub fn dependency_closure(&self, index: usize) -> Result<Vec<usize>, RegistryError> {
        let requires: Vec<Vec<usize>> = self.items.iter().map(|i| i.requires.clone()).collect();
        graph::dependency_closure(&requires, index, |i| {
            self.items.get(i).map_or("?", |it| it.id.as_str())
        })
    }
}

/// Return the built-in registry.
///
/// # Errors
///
/// Returns an error only if the built-in table is malformed.
pub fn load_registry() -> Result<Registry, RegistryError> {
    Registry::builtin()
}

/// Built-in catalog for the EPass board.
///
/// Conflicts follow pin usage:
/// `adc_pa123` uses PA1/PA2/PA3, `adc_pa1` uses PA1, `uart1` uses PA2/PA3,
/// `i2s0_pa` uses PA1/PA2/PA3/PE3 and `i2s0_pe` uses PA1/PE5/PE6/PE3.
fn builtin_defs() -> Vec<ItemDef> {
    use Category::{Extension, Interface};
    use DeviceRevision::{V0_3_4, V0_5};

    vec![
        ItemDef::new("adc_pa123", Interface, "Use PA1/PA2/PA3 as ADC pins")
            .conflicts(&["adc_pa1", "uart1", "i2s0_pa", "i2s0_pe"]),
        ItemDef::new("adc_pa1", Interface, "Use PA1 as ADC pin")
            .conflicts(&["adc_pa123", "i2s0_pa", "i2s0_pe"]),
        ItemDef::new("i2c0", Interface, "Enable I2C0\n(PD0/PD12 as I2C pins)"),
        ItemDef::new(
            "i2s0_pa",
            Interface,
            "Enable I2S0\n(PA1/PA2/PA3/PE3 routing)\nOnly available on EPass >= 0.5",
        )
        .since(V0_5)
        .conflicts(&["i2s0_pe", "adc_pa123", "adc_pa1", "uart1"]),
        ItemDef::new(
            "i2s0_pe",
            Interface,
            "Enable I2S0\n(PA1/PE5/PE6/PE3 routing)\nOnly available on EPass >= 0.5",
        )
        .since(V0_5)
        .conflicts(&["i2s0_pa", "adc_pa123", "adc_pa1"]),
        ItemDef::new("spi1", Interface, "Enable SPI1\n(PE7/PE8/PE9/PE10 as SPI pins)")
            .conflicts(&["uart2"]),
        ItemDef::new("uart1", Interface, "Enable UART1\n(PA2/PA3 as UART1 pins)")
            .conflicts(&["adc_pa123", "i2s0_pa"]),
        ItemDef::new("uart2", Interface, "Enable UART2\n(PA7/PA8 as UART2 pins)")
            .conflicts(&["spi1"]),
        ItemDef::new("usbhost", Interface, "Set USB mode to USB Host"),
        ItemDef::new("usbhs", Interface, "Enable USB2.0 High-Speed mode"),
        ItemDef::new(
            "cardkb",
            Extension,
            "Enable M5Stack CardKB support\n(requires i2c0)",
        )
        .requires(&["i2c0"]),
        ItemDef::new(
            "lsm6ds3_pre0.4",
            Extension,
            "Enable onboard IMU support for <= 0.4\n(requires i2c0)",
        )
        .until(V0_3_4)
        .requires(&["i2c0"]),
    ]
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn reg() -> Registry {
        Registry::builtin().expect("built-in registry is valid")
    }

    fn item<'a>(reg: &'a Registry, id: &str) -> &'a ConfigItem {
        reg.get(reg.find(id).unwrap()).unwrap()
    }

    // -----------------------------------------------------------------------
    // Built-in catalog
    // -----------------------------------------------------------------------

    #[test]
    fn builtin_registry_order_is_stable() {
        let r = reg();
        let ids: Vec<&str> = r.items().iter().map(|i| i.id.as_str()).collect();
        insta::assert_snapshot!(
            ids.join(" "),
            @"adc_pa123 adc_pa1 i2c0 i2s0_pa i2s0_pe spi1 uart1 uart2 usbhost usbhs cardkb lsm6ds3_pre0.4"
        );
    }

    #[test]
    fn builtin_categories_partition_catalog() {
        let r = reg();
        assert_eq!(r.in_category(Category::Interface).count(), 10);
        assert_eq!(r.in_category(Category::Extension).count(), 2);
    }

    #[test]
    fn builtin_conflicts_are_symmetric() {
        let r = reg();
        for (i, it) in r.items().iter().enumerate() {
            for &c in it.declared_conflicts() {
                assert!(
                    r.items()[c].declared_conflicts().contains(&i),
                    "{} lists {} but not the reverse",
                    it.id,
                    r.items()[c].id
                );
            }
        }
    }

    #[test]
    fn find_in_respects_category() {
        let r = reg();
        assert!(r.find_in("i2c0", Category::Interface).is_some());
        assert!(r.find_in("i2c0", Category::Extension).is_none());
        assert!(r.find_in("cardkb", Category::Extension).is_some());
        assert!(r.find_in("bogus", Category::Interface).is_none());
    }

    // -----------------------------------------------------------------------
    // Availability
    // -----------------------------------------------------------------------

    #[test]
    fn unbounded_option_available_on_every_known_revision() {
        let r = reg();
        for rev in DeviceRevision::ALL {
            assert!(item(&r, "i2c0").is_available(rev));
        }
    }

    #[test]
    fn nothing_available_on_unknown_revision() {
        let r = reg();
        assert!(r.items().iter().all(|it| !it.is_available(DeviceRevision::Unknown)));
    }

    #[test]
    fn lower_bound_is_inclusive() {
        let r = reg();
        let i2s = item(&r, "i2s0_pe");
        assert!(!i2s.is_available(DeviceRevision::V0_2));
        assert!(!i2s.is_available(DeviceRevision::V0_3_4));
        assert!(i2s.is_available(DeviceRevision::V0_5));
        assert!(i2s.is_available(DeviceRevision::V0_6));
    }

    #[test]
    fn upper_bound_is_inclusive() {
        let r = reg();
        let imu = item(&r, "lsm6ds3_pre0.4");
        assert!(imu.is_available(DeviceRevision::V0_2));
        assert!(imu.is_available(DeviceRevision::V0_3_4));
        assert!(!imu.is_available(DeviceRevision::V0_5));
    }

    #[test]
    fn availability_is_monotonic_below_upper_bound() {
        let r = reg();
        for it in r.items() {
            for (lo_i, lo) in DeviceRevision::ALL.iter().enumerate() {
                for hi in &DeviceRevision::ALL[lo_i + 1..] {
                    let hi_rank = hi.rank().unwrap();
                    if it.is_available(*lo) && it.max_rank.is_none_or(|m| m >= hi_rank) {
                        assert!(it.is_available(*hi), "{} at {hi}", it.id);
                    }
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Edges
    // -----------------------------------------------------------------------

    #[test]
    fn conflicts_are_undirected() {
        let defs = vec![
            ItemDef::new("a", Category::Interface, "").conflicts(&["b"]),
            ItemDef::new("b", Category::Interface, ""),
            ItemDef::new("c", Category::Interface, ""),
        ];
        let r = Registry::from_defs(defs).unwrap();
        assert_eq!(r.conflicts_of(0), vec![1]);
        assert_eq!(r.conflicts_of(1), vec![0]);
        assert!(r.conflicts_of(2).is_empty());
    }

    #[test]
    fn dependency_closure_of_cardkb_is_i2c0() {
        let r = reg();
        let closure = r.dependency_closure(r.find("cardkb").unwrap()).unwrap();
        assert_eq!(closure, vec![r.find("i2c0").unwrap()]);
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    #[test]
    fn duplicate_id_rejected() {
        let defs = vec![
            ItemDef::new("a", Category::Interface, ""),
            ItemDef::new("a", Category::Extension, ""),
        ];
        assert_eq!(
            Registry::from_defs(defs).unwrap_err(),
            RegistryError::DuplicateId("a".to_string())
        );
    }

    #[test]
    fn dangling_reference_rejected() {
        let defs = vec![ItemDef::new("a", Category::Extension, "").requires(&["nope"])];
        assert_eq!(
            Registry::from_defs(defs).unwrap_err(),
            RegistryError::UnknownReference {
                option: "a".to_string(),
                reference: "nope".to_string(),
            }
        );
    }

    #[test]
    fn requires_cycle_rejected() {
        let defs = vec![
            ItemDef::new("a", Category::Extension, "").requires(&["b"]),
            ItemDef::new("b", Category::Extension, "").requires(&["a"]),
        ];
        assert_eq!(
            Registry::from_defs(defs).unwrap_err(),
            RegistryError::DependencyCycle("a, b".to_string())
        );
    }

    #[test]
    fn category_parses_key_names() {
        assert_eq!("interface".parse::<Category>().unwrap(), Category::Interface);
        assert_eq!("EXT".parse::<Category>().unwrap(), Category::Extension);
        assert!("misc".parse::<Category>().is_err());
        assert_eq!(Category::Extension.prefix(), "ext=");
    }
}
