//! Scalar option mapping.
//!
//! Every top-level scalar key is described by one [`ScalarOption`] entry in
//! [`SCALAR_OPTIONS`]: its config path, the value type it expects and a setter
//! writing into [`Options`]. [`map_scalars`] walks the table in order, so the
//! table order is also the processing order.

use std::str::FromStr;

use tracing::warn;

use crate::config::document::{Document, Value};
use crate::config::error::{ConfigError, ConfigWarning};
use crate::logging::LogLevel;
use crate::models::{
    normalize_d, opacity_from_f64, parse_blur_kernels, Options, WinOptionMasks, WinType,
    MAX_BLUR_PASS,
};

/// Destination of one mapping step
pub struct MapContext<'a> {
    options: &'a mut Options,
    masks: &'a mut WinOptionMasks,
    warnings: &'a mut Vec<ConfigWarning>,
    path: &'static str,
}

impl MapContext<'_> {
    fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(ConfigWarning::new(self.path, message));
    }

    fn wrong_type(&mut self, expected: &str, found: &Value) {
        self.warn(format!(
            "Option `{}` expects a {}, found {}; ignored",
            self.path,
            expected,
            found.type_name()
        ));
    }

    fn disable_wintype_shadow(&mut self, wintype: WinType) {
        self.options.wintype_mut(wintype).shadow = false;
        self.masks[wintype.index()].shadow = true;
    }
}

/// Expected value type and setter of a scalar option
#[derive(Clone, Copy)]
pub enum OptionKind {
    Bool(fn(&mut MapContext<'_>, bool)),
    Int(fn(&mut MapContext<'_>, i32)),
    Int64(fn(&mut MapContext<'_>, i64)),
    Float(fn(&mut MapContext<'_>, f64)),
    Str(fn(&mut MapContext<'_>, &str) -> Result<(), ConfigError>),
}

impl OptionKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            OptionKind::Bool(_) => "bool",
            OptionKind::Int(_) | OptionKind::Int64(_) => "int",
            OptionKind::Float(_) => "float",
            OptionKind::Str(_) => "string",
        }
    }
}

/// A top-level config key bound to an [`Options`] field
#[derive(Clone, Copy)]
pub struct ScalarOption {
    pub path: &'static str,
    pub kind: OptionKind,
}

const fn opt(path: &'static str, kind: OptionKind) -> ScalarOption {
    ScalarOption { path, kind }
}

const REMOVED_MESSAGE: &str = "has been removed. If you encounter problems without this feature, \
                               please feel free to open a bug report";

fn parse_enum<T: FromStr>(option: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::UnknownEnumValue {
        option,
        value: value.to_string(),
    })
}

pub static SCALAR_OPTIONS: &[ScalarOption] = &[
    opt("fade-delta", OptionKind::Int(|c, v| c.options.fade_delta = v)),
    opt(
        "fade-in-step",
        OptionKind::Float(|c, v| c.options.fade_in_step = opacity_from_f64(v)),
    ),
    opt(
        "fade-out-step",
        OptionKind::Float(|c, v| c.options.fade_out_step = opacity_from_f64(v)),
    ),
    opt("shadow-radius", OptionKind::Int(|c, v| c.options.shadow_radius = v)),
    opt("shadow-opacity", OptionKind::Float(|c, v| c.options.shadow_opacity = v)),
    opt("shadow-offset-x", OptionKind::Int(|c, v| c.options.shadow_offset_x = v)),
    opt("shadow-offset-y", OptionKind::Int(|c, v| c.options.shadow_offset_y = v)),
    opt(
        "inactive-opacity",
        OptionKind::Float(|c, v| c.options.inactive_opacity = opacity_from_f64(v)),
    ),
    opt(
        "active-opacity",
        OptionKind::Float(|c, v| c.options.active_opacity = opacity_from_f64(v)),
    ),
    opt("frame-opacity", OptionKind::Float(|c, v| c.options.frame_opacity = v)),
    opt("shadow", OptionKind::Bool(|c, v| c.options.shadow_enable = v)),
    opt(
        "no-dock-shadow",
        OptionKind::Bool(|c, _| {
            c.warn(
                "Option `no-dock-shadow` is deprecated, and will be removed. \
                 Please use the wintype option `shadow` of `dock` instead.",
            );
            c.disable_wintype_shadow(WinType::Dock);
        }),
    ),
    opt(
        "no-dnd-shadow",
        OptionKind::Bool(|c, _| {
            c.warn(
                "Option `no-dnd-shadow` is deprecated, and will be removed. \
                 Please use the wintype option `shadow` of `dnd` instead.",
            );
            c.disable_wintype_shadow(WinType::Dnd);
        }),
    ),
    opt(
        "menu-opacity",
        OptionKind::Float(|c, v| {
            c.warn(
                "Option `menu-opacity` is deprecated, and will be removed. Please use the \
                 wintype option `opacity` of `popup_menu` and `dropdown_menu` instead.",
            );
            for wintype in [WinType::DropdownMenu, WinType::PopupMenu] {
                c.options.wintype_mut(wintype).opacity = normalize_d(v);
                c.masks[wintype.index()].opacity = true;
            }
        }),
    ),
    opt("fading", OptionKind::Bool(|c, v| c.options.fading_enable = v)),
    opt("no-fading-openclose", OptionKind::Bool(|c, v| c.options.no_fading_openclose = v)),
    opt(
        "no-fading-destroyed-argb",
        OptionKind::Bool(|c, v| c.options.no_fading_destroyed_argb = v),
    ),
    opt("shadow-red", OptionKind::Float(|c, v| c.options.shadow_red = v)),
    opt("shadow-green", OptionKind::Float(|c, v| c.options.shadow_green = v)),
    opt("shadow-blue", OptionKind::Float(|c, v| c.options.shadow_blue = v)),
    opt(
        "shadow-exclude-reg",
        OptionKind::Str(|c, v| {
            c.options.shadow_exclude_reg = Some(v.to_string());
            Ok(())
        }),
    ),
    opt(
        "inactive-opacity-override",
        OptionKind::Bool(|c, v| c.options.inactive_opacity_override = v),
    ),
    opt("inactive-dim", OptionKind::Float(|c, v| c.options.inactive_dim = v)),
    opt("mark-wmwin-focused", OptionKind::Bool(|c, v| c.options.mark_wmwin_focused = v)),
    opt("mark-ovredir-focused", OptionKind::Bool(|c, v| c.options.mark_ovredir_focused = v)),
    opt("shadow-ignore-shaped", OptionKind::Bool(|c, v| c.options.shadow_ignore_shaped = v)),
    opt(
        "detect-rounded-corners",
        OptionKind::Bool(|c, v| c.options.detect_rounded_corners = v),
    ),
    opt("xinerama-shadow-crop", OptionKind::Bool(|c, v| c.options.xinerama_shadow_crop = v)),
    opt(
        "detect-client-opacity",
        OptionKind::Bool(|c, v| c.options.detect_client_opacity = v),
    ),
    opt("refresh-rate", OptionKind::Int(|c, v| c.options.refresh_rate = v)),
    opt(
        "vsync",
        OptionKind::Str(|c, v| {
            c.options.vsync = parse_enum("vsync", v)?;
            Ok(())
        }),
    ),
    opt(
        "backend",
        OptionKind::Str(|c, v| {
            c.options.backend = parse_enum("backend", v)?;
            Ok(())
        }),
    ),
    opt(
        "log-level",
        OptionKind::Str(|c, v| {
            let level = v.parse::<LogLevel>().unwrap_or_else(|_| {
                c.warn(format!("Invalid log level \"{}\", defaults to WARN", v));
                LogLevel::Warn
            });
            c.options.log_level = Some(level);
            Ok(())
        }),
    ),
    opt("sw-opti", OptionKind::Bool(|c, v| c.options.sw_opti = v)),
    opt("use-ewmh-active-win", OptionKind::Bool(|c, v| c.options.use_ewmh_active_win = v)),
    opt("unredir-if-possible", OptionKind::Bool(|c, v| c.options.unredir_if_possible = v)),
    opt(
        "unredir-if-possible-delay",
        OptionKind::Int64(|c, v| c.options.unredir_if_possible_delay = v),
    ),
    opt("inactive-dim-fixed", OptionKind::Bool(|c, v| c.options.inactive_dim_fixed = v)),
    opt("detect-transient", OptionKind::Bool(|c, v| c.options.detect_transient = v)),
    opt("detect-client-leader", OptionKind::Bool(|c, v| c.options.detect_client_leader = v)),
    opt("blur-background", OptionKind::Bool(|c, v| c.options.blur_background = v)),
    opt(
        "blur-background-frame",
        OptionKind::Bool(|c, v| c.options.blur_background_frame = v),
    ),
    opt(
        "blur-background-fixed",
        OptionKind::Bool(|c, v| c.options.blur_background_fixed = v),
    ),
    opt(
        "blur-kern",
        OptionKind::Str(|c, v| {
            let parsed = parse_blur_kernels(v, MAX_BLUR_PASS)?;
            c.options.blur_kerns = parsed.kernels;
            c.options.blur_kern_has_negative = parsed.has_negative;
            Ok(())
        }),
    ),
    opt("resize-damage", OptionKind::Int(|c, v| c.options.resize_damage = v)),
    opt("glx-no-stencil", OptionKind::Bool(|c, v| c.options.glx_no_stencil = v)),
    opt(
        "glx-no-rebind-pixmap",
        OptionKind::Bool(|c, v| c.options.glx_no_rebind_pixmap = v),
    ),
    opt(
        "glx-swap-method",
        OptionKind::Str(|c, v| {
            c.options.glx_swap_method = parse_enum("glx-swap-method", v)?;
            Ok(())
        }),
    ),
    opt("glx-use-gpushader4", OptionKind::Bool(|c, v| c.options.glx_use_gpushader4 = v)),
    opt("xrender-sync", OptionKind::Bool(|c, v| c.options.xrender_sync = v)),
    opt("xrender-sync-fence", OptionKind::Bool(|c, v| c.options.xrender_sync_fence = v)),
    // Removed options, accepted with a warning
    opt(
        "clear-shadow",
        OptionKind::Bool(|c, _| {
            c.warn(
                "\"clear-shadow\" is removed as an option, and is always enabled now. \
                 Consider removing it from your config file",
            );
        }),
    ),
    opt(
        "paint-on-overlay",
        OptionKind::Bool(|c, _| {
            c.warn(
                "\"paint-on-overlay\" has been removed as an option, \
                 and is enabled whenever possible",
            );
        }),
    ),
    opt(
        "alpha-step",
        OptionKind::Float(|c, _| {
            c.warn(
                "\"alpha-step\" has been removed, \
                 compton now tries to make use of all alpha values",
            );
        }),
    ),
    opt(
        "glx-use-copysubbuffermesa",
        OptionKind::Bool(|c, v| {
            if v {
                c.warn(format!("\"glx-use-copysubbuffermesa\" {}", REMOVED_MESSAGE));
            }
        }),
    ),
    opt(
        "glx-copy-from-front",
        OptionKind::Bool(|c, v| {
            if v {
                c.warn(format!("\"glx-copy-from-front\" {}", REMOVED_MESSAGE));
            }
        }),
    ),
];

/// Last key mapped before the condition lists and opacity rules are built
pub const RULE_LISTS_AFTER: &str = "detect-client-leader";

/// [`SCALAR_OPTIONS`] split into the keys mapped before the rule lists and
/// the keys mapped after them
pub fn scalar_stages() -> (&'static [ScalarOption], &'static [ScalarOption]) {
    let at = SCALAR_OPTIONS
        .iter()
        .position(|option| option.path == RULE_LISTS_AFTER)
        .map_or(SCALAR_OPTIONS.len(), |i| i + 1);
    SCALAR_OPTIONS.split_at(at)
}

/// Look up a scalar option binding by config path
pub fn find_option(path: &str) -> Option<&'static ScalarOption> {
    SCALAR_OPTIONS.iter().find(|option| option.path == path)
}

/// Apply every scalar option present in `doc`.
///
/// Absent keys leave their field untouched, as do keys of the wrong type
/// (with a warning). Stops at the first fatal error.
pub fn map_scalars(
    doc: &Document,
    options: &mut Options,
    masks: &mut WinOptionMasks,
    warnings: &mut Vec<ConfigWarning>,
) -> Result<(), ConfigError> {
    map_options(doc, SCALAR_OPTIONS, options, masks, warnings)
}

/// Apply the bindings of `table` in order
pub fn map_options(
    doc: &Document,
    table: &[ScalarOption],
    options: &mut Options,
    masks: &mut WinOptionMasks,
    warnings: &mut Vec<ConfigWarning>,
) -> Result<(), ConfigError> {
    for option in table {
        let Some(value) = doc.lookup(option.path) else {
            continue;
        };
        let mut ctx = MapContext {
            options: &mut *options,
            masks: &mut *masks,
            warnings: &mut *warnings,
            path: option.path,
        };

        match option.kind {
            OptionKind::Bool(set) => match value.as_bool() {
                Some(v) => set(&mut ctx, v),
                None => ctx.wrong_type("bool", value),
            },
            OptionKind::Int(set) => match value.as_int() {
                Some(v) => set(&mut ctx, v),
                None => ctx.wrong_type("32-bit int", value),
            },
            OptionKind::Int64(set) => match value.as_int64() {
                Some(v) => set(&mut ctx, v),
                None => ctx.wrong_type("int", value),
            },
            OptionKind::Float(set) => match value.as_float() {
                Some(v) => set(&mut ctx, v),
                None => ctx.wrong_type("float", value),
            },
            OptionKind::Str(set) => match value.as_str() {
                Some(v) => set(&mut ctx, v)?,
                None => ctx.wrong_type("string", value),
            },
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{empty_masks, Backend, GlxSwapMethod, VSyncMode, OPAQUE};

    fn map(source: &str) -> (Result<(), ConfigError>, Options, WinOptionMasks, Vec<ConfigWarning>) {
        let doc = Document::parse(source, None, None).unwrap();
        let mut options = Options::default();
        let mut masks = empty_masks();
        let mut warnings = Vec::new();
        let result = map_scalars(&doc, &mut options, &mut masks, &mut warnings);
        (result, options, masks, warnings)
    }

    #[test]
    fn test_table_paths_unique() {
        for (i, option) in SCALAR_OPTIONS.iter().enumerate() {
            assert!(
                SCALAR_OPTIONS[i + 1..].iter().all(|o| o.path != option.path),
                "duplicate entry for {}",
                option.path
            );
        }
        assert_eq!(find_option("shadow-radius").unwrap().kind.type_name(), "int");
        assert!(find_option("shadow-exclude").is_none());
    }

    #[test]
    fn test_scalar_stages_split_at_rule_lists() {
        let (early, late) = scalar_stages();
        assert_eq!(early.len() + late.len(), SCALAR_OPTIONS.len());
        assert_eq!(early.last().map(|o| o.path), Some(RULE_LISTS_AFTER));
        assert_eq!(late.first().map(|o| o.path), Some("blur-background"));
        assert!(early.iter().any(|o| o.path == "vsync"));
        assert!(late.iter().any(|o| o.path == "glx-swap-method"));
    }

    #[test]
    fn test_basic_scalars() {
        let (result, options, _, warnings) = map(
            r#"
            shadow = true;
            fading = true;
            shadow-radius = 7;
            shadow-offset-x = -7;
            shadow-opacity = 0.5;
            fade-delta = 4;
            inactive-opacity = 0.8;
            active-opacity = 2;
            shadow-exclude-reg = "x10+0+0";
            unredir-if-possible-delay = 5000000000;
            "#,
        );
        assert!(result.is_ok());
        assert!(warnings.is_empty());
        assert!(options.shadow_enable);
        assert!(options.fading_enable);
        assert_eq!(options.shadow_radius, 7);
        assert_eq!(options.shadow_offset_x, -7);
        assert_eq!(options.shadow_offset_y, -15);
        assert_eq!(options.shadow_opacity, 0.5);
        assert_eq!(options.fade_delta, 4);
        assert_eq!(options.inactive_opacity, opacity_from_f64(0.8));
        assert_eq!(options.active_opacity, OPAQUE);
        assert_eq!(options.shadow_exclude_reg.as_deref(), Some("x10+0+0"));
        assert_eq!(options.unredir_if_possible_delay, 5_000_000_000);
    }

    #[test]
    fn test_enums() {
        let (result, options, _, _) = map(
            r#"vsync = "opengl-swc"; backend = "glx"; glx-swap-method = "buffer-age";"#,
        );
        assert!(result.is_ok());
        assert_eq!(options.vsync, VSyncMode::OpenglSwc);
        assert_eq!(options.backend, Backend::Glx);
        assert_eq!(options.glx_swap_method, GlxSwapMethod::BufferAge);
    }

    #[test]
    fn test_unknown_vsync_stops_processing() {
        let (result, options, _, _) = map(r#"vsync = "not-a-real-mode"; xrender-sync = true;"#);
        match result {
            Err(ConfigError::UnknownEnumValue { option, value }) => {
                assert_eq!(option, "vsync");
                assert_eq!(value, "not-a-real-mode");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        // xrender-sync comes after vsync in the table
        assert!(!options.xrender_sync);
    }

    #[test]
    fn test_unknown_backend_and_swap_method() {
        let (result, _, _, _) = map(r#"backend = "vulkan";"#);
        assert!(matches!(result, Err(ConfigError::UnknownEnumValue { option: "backend", .. })));

        let (result, _, _, _) = map(r#"glx-swap-method = "3x";"#);
        assert!(matches!(
            result,
            Err(ConfigError::UnknownEnumValue { option: "glx-swap-method", .. })
        ));
    }

    #[test]
    fn test_log_level() {
        let (result, options, _, warnings) = map(r#"log-level = "debug";"#);
        assert!(result.is_ok());
        assert_eq!(options.log_level, Some(LogLevel::Debug));
        assert!(warnings.is_empty());

        let (result, options, _, warnings) = map(r#"log-level = "chatty";"#);
        assert!(result.is_ok());
        assert_eq!(options.log_level, Some(LogLevel::Warn));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].option, "log-level");
    }

    #[test]
    fn test_deprecated_wintype_options() {
        let (_, options, masks, warnings) =
            map("no-dock-shadow = true; no-dnd-shadow = false; menu-opacity = 1.5;");
        assert!(!options.wintype(WinType::Dock).shadow);
        assert!(masks[WinType::Dock.index()].shadow);
        // Either value turns the shadow off
        assert!(!options.wintype(WinType::Dnd).shadow);
        assert!(masks[WinType::Dnd.index()].shadow);
        assert_eq!(options.wintype(WinType::PopupMenu).opacity, 1.0);
        assert_eq!(options.wintype(WinType::DropdownMenu).opacity, 1.0);
        assert!(masks[WinType::PopupMenu.index()].opacity);
        assert!(masks[WinType::DropdownMenu.index()].opacity);
        assert!(!masks[WinType::Menu.index()].opacity);
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn test_no_dock_shadow_false_still_disables() {
        let (result, options, masks, warnings) = map("no-dock-shadow = false;");
        assert!(result.is_ok());
        assert!(!options.wintype(WinType::Dock).shadow);
        assert!(masks[WinType::Dock.index()].shadow);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_removed_options_warn() {
        let (_, _, _, warnings) = map(
            "clear-shadow = true; paint-on-overlay = false; alpha-step = 0.03; \
             glx-use-copysubbuffermesa = false; glx-copy-from-front = true;",
        );
        let options: Vec<&str> = warnings.iter().map(|w| w.option.as_str()).collect();
        assert_eq!(
            options,
            vec!["clear-shadow", "paint-on-overlay", "alpha-step", "glx-copy-from-front"]
        );
    }

    #[test]
    fn test_wrong_type_leaves_field() {
        let (result, options, _, warnings) = map(r#"shadow-radius = "big"; shadow = 1;"#);
        assert!(result.is_ok());
        assert_eq!(options.shadow_radius, 12);
        assert!(!options.shadow_enable);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_blur_kern() {
        let (result, options, _, _) = map(r#"blur-kern = "3x3box";"#);
        assert!(result.is_ok());
        assert_eq!(options.blur_kerns.len(), 1);
        assert!(!options.blur_kern_has_negative);

        let (result, _, _, _) = map(r#"blur-kern = "3,3,1,1";"#);
        assert!(matches!(result, Err(ConfigError::MalformedBlurKernel(_))));
    }
}
