//! Per-window-type overrides from the `wintypes` group

use crate::config::document::Document;
use crate::models::{normalize_d, Options, WinOptionMasks, WinType};

/// Apply the `wintypes.<name>` groups.
///
/// Only fields present in a group are written, and each write sets the
/// matching mask bit. Types without a group are left alone.
pub fn overlay_wintypes(doc: &Document, options: &mut Options, masks: &mut WinOptionMasks) {
    for wintype in WinType::ALL {
        let Some(group) = doc.lookup_group(&format!("wintypes.{}", wintype.name())) else {
            continue;
        };
        let option = options.wintype_mut(wintype);
        let mask = &mut masks[wintype.index()];

        if let Some(v) = group.lookup_bool("shadow") {
            option.shadow = v;
            mask.shadow = true;
        }
        if let Some(v) = group.lookup_bool("fade") {
            option.fade = v;
            mask.fade = true;
        }
        if let Some(v) = group.lookup_bool("focus") {
            option.focus = v;
            mask.focus = true;
        }
        if let Some(v) = group.lookup_bool("full-shadow") {
            option.full_shadow = v;
            mask.full_shadow = true;
        }
        if let Some(v) = group.lookup_bool("redir-ignore") {
            option.redir_ignore = v;
            mask.redir_ignore = true;
        }
        if let Some(v) = group.lookup_float("opacity") {
            option.opacity = normalize_d(v);
            mask.opacity = true;
        }
    }
}
