use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of window types known to the compositor
pub const NUM_WINTYPES: usize = 15;

/// EWMH window type of a managed window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinType {
    Unknown,
    Desktop,
    Dock,
    Toolbar,
    Menu,
    Utility,
    Splash,
    Dialog,
    Normal,
    DropdownMenu,
    PopupMenu,
    Tooltip,
    Notify,
    Combo,
    Dnd,
}

impl WinType {
    /// All window types, in slot order
    pub const ALL: [WinType; NUM_WINTYPES] = [
        WinType::Unknown,
        WinType::Desktop,
        WinType::Dock,
        WinType::Toolbar,
        WinType::Menu,
        WinType::Utility,
        WinType::Splash,
        WinType::Dialog,
        WinType::Normal,
        WinType::DropdownMenu,
        WinType::PopupMenu,
        WinType::Tooltip,
        WinType::Notify,
        WinType::Combo,
        WinType::Dnd,
    ];

    /// Name used for the `wintypes.<name>` group and in window conditions
    pub fn name(self) -> &'static str {
        match self {
            WinType::Unknown => "unknown",
            WinType::Desktop => "desktop",
            WinType::Dock => "dock",
            WinType::Toolbar => "toolbar",
            WinType::Menu => "menu",
            WinType::Utility => "utility",
            WinType::Splash => "splash",
            WinType::Dialog => "dialog",
            WinType::Normal => "normal",
            WinType::DropdownMenu => "dropdown_menu",
            WinType::PopupMenu => "popup_menu",
            WinType::Tooltip => "tooltip",
            WinType::Notify => "notify",
            WinType::Combo => "combo",
            WinType::Dnd => "dnd",
        }
    }

    /// Slot of this type in the per-type option arrays
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for WinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WinType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WinType::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| format!("Unknown window type: {}", s))
    }
}

/// Effect overrides applied to every window of one type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WinOption {
    pub shadow: bool,
    pub fade: bool,
    pub focus: bool,
    pub full_shadow: bool,
    pub redir_ignore: bool,
    /// Opacity in `0.0..=1.0`
    pub opacity: f64,
}

impl Default for WinOption {
    fn default() -> Self {
        Self {
            shadow: true,
            fade: true,
            focus: false,
            full_shadow: false,
            redir_ignore: false,
            opacity: 1.0,
        }
    }
}

/// Records which [`WinOption`] fields were set explicitly by a config source.
///
/// A later source (command-line flags, built-in per-type defaults) only fills
/// in a field whose bit is still false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinOptionMask {
    pub shadow: bool,
    pub fade: bool,
    pub focus: bool,
    pub full_shadow: bool,
    pub redir_ignore: bool,
    pub opacity: bool,
}

impl WinOptionMask {
    /// True when no field has been set
    pub fn is_empty(&self) -> bool {
        *self == WinOptionMask::default()
    }
}

/// Per-type option slots, indexed by [`WinType::index`]
pub type WinOptions = [WinOption; NUM_WINTYPES];

/// Per-type explicit-set masks, parallel to [`WinOptions`]
pub type WinOptionMasks = [WinOptionMask; NUM_WINTYPES];

/// Fresh mask array with every bit cleared
pub fn empty_masks() -> WinOptionMasks {
    [WinOptionMask::default(); NUM_WINTYPES]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_matches_slot_order() {
        for (i, wintype) in WinType::ALL.iter().enumerate() {
            assert_eq!(wintype.index(), i);
        }
        assert_eq!(WinType::Dnd.index(), NUM_WINTYPES - 1);
    }

    #[test]
    fn test_name_round_trip() {
        assert_eq!("popup_menu".parse::<WinType>().unwrap(), WinType::PopupMenu);
        assert_eq!(WinType::DropdownMenu.to_string(), "dropdown_menu");
        assert!("popup-menu".parse::<WinType>().is_err());
    }

    #[test]
    fn test_defaults() {
        let option = WinOption::default();
        assert!(option.shadow);
        assert!(option.fade);
        assert!(!option.focus);
        assert_eq!(option.opacity, 1.0);

        assert!(empty_masks().iter().all(WinOptionMask::is_empty));
    }
}
