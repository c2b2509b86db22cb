use serde::Serialize;

use crate::logging::LogLevel;
use crate::models::blur::ConvKernel;
use crate::models::render::{Backend, GlxSwapMethod, VSyncMode};
use crate::models::rule::{ConditionList, OpacityRuleList};
use crate::models::wintype::{WinOption, WinOptions, WinType, NUM_WINTYPES};

/// Fully opaque in the fixed-point opacity unit
pub const OPAQUE: u32 = 0xffff_ffff;

/// Clamp `d` into `[0, 1]`
pub fn normalize_d(d: f64) -> f64 {
    if d.is_nan() {
        return 0.0;
    }
    d.clamp(0.0, 1.0)
}

/// Convert a `0.0..=1.0` opacity into the fixed-point unit
pub fn opacity_from_f64(d: f64) -> u32 {
    (normalize_d(d) * f64::from(OPAQUE)) as u32
}

/// Convert a fixed-point opacity back into `0.0..=1.0`
pub fn opacity_to_f64(o: u32) -> f64 {
    f64::from(o) / f64::from(OPAQUE)
}

/// Compositor options, populated from defaults and then the config file
#[derive(Debug, Clone, Serialize)]
pub struct Options {
    // Shadows
    pub shadow_enable: bool,
    pub shadow_radius: i32,
    pub shadow_opacity: f64,
    pub shadow_offset_x: i32,
    pub shadow_offset_y: i32,
    pub shadow_red: f64,
    pub shadow_green: f64,
    pub shadow_blue: f64,
    /// Geometry string of the screen region where shadows are not painted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow_exclude_reg: Option<String>,
    pub shadow_ignore_shaped: bool,
    pub xinerama_shadow_crop: bool,
    pub shadow_blacklist: ConditionList,

    // Fading
    pub fading_enable: bool,
    /// Milliseconds between fade steps
    pub fade_delta: i32,
    pub fade_in_step: u32,
    pub fade_out_step: u32,
    pub no_fading_openclose: bool,
    pub no_fading_destroyed_argb: bool,
    pub fade_blacklist: ConditionList,

    // Opacity
    pub inactive_opacity: u32,
    pub active_opacity: u32,
    pub frame_opacity: f64,
    pub inactive_opacity_override: bool,
    pub inactive_dim: f64,
    pub inactive_dim_fixed: bool,
    pub detect_client_opacity: bool,
    pub opacity_rules: OpacityRuleList,

    // Focus
    pub mark_wmwin_focused: bool,
    pub mark_ovredir_focused: bool,
    pub use_ewmh_active_win: bool,
    pub focus_blacklist: ConditionList,
    pub invert_color_list: ConditionList,

    // Window detection
    pub detect_rounded_corners: bool,
    pub detect_transient: bool,
    pub detect_client_leader: bool,

    // Blur
    pub blur_background: bool,
    pub blur_background_frame: bool,
    pub blur_background_fixed: bool,
    pub blur_background_blacklist: ConditionList,
    pub blur_kerns: Vec<ConvKernel>,
    pub blur_kern_has_negative: bool,

    // Backend and vsync
    pub backend: Backend,
    pub vsync: VSyncMode,
    pub refresh_rate: i32,
    pub sw_opti: bool,
    pub resize_damage: i32,
    pub glx_no_stencil: bool,
    pub glx_no_rebind_pixmap: bool,
    pub glx_swap_method: GlxSwapMethod,
    pub glx_use_gpushader4: bool,
    pub xrender_sync: bool,
    pub xrender_sync_fence: bool,

    // Unredirection
    pub unredir_if_possible: bool,
    /// Milliseconds to wait before unredirecting
    pub unredir_if_possible_delay: i64,
    pub unredir_if_possible_blacklist: ConditionList,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,

    pub wintype_option: WinOptions,
}

impl Options {
    /// Options slot for one window type
    pub fn wintype(&self, wintype: WinType) -> &WinOption {
        &self.wintype_option[wintype.index()]
    }

    pub fn wintype_mut(&mut self, wintype: WinType) -> &mut WinOption {
        &mut self.wintype_option[wintype.index()]
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            shadow_enable: false,
            shadow_radius: 12,
            shadow_opacity: 0.75,
            shadow_offset_x: -15,
            shadow_offset_y: -15,
            shadow_red: 0.0,
            shadow_green: 0.0,
            shadow_blue: 0.0,
            shadow_exclude_reg: None,
            shadow_ignore_shaped: false,
            xinerama_shadow_crop: false,
            shadow_blacklist: ConditionList::new(),

            fading_enable: false,
            fade_delta: 10,
            fade_in_step: opacity_from_f64(0.028),
            fade_out_step: opacity_from_f64(0.03),
            no_fading_openclose: false,
            no_fading_destroyed_argb: false,
            fade_blacklist: ConditionList::new(),

            inactive_opacity: OPAQUE,
            active_opacity: OPAQUE,
            frame_opacity: 1.0,
            inactive_opacity_override: false,
            inactive_dim: 0.0,
            inactive_dim_fixed: false,
            detect_client_opacity: false,
            opacity_rules: OpacityRuleList::new(),

            mark_wmwin_focused: false,
            mark_ovredir_focused: false,
            use_ewmh_active_win: false,
            focus_blacklist: ConditionList::new(),
            invert_color_list: ConditionList::new(),

            detect_rounded_corners: false,
            detect_transient: false,
            detect_client_leader: false,

            blur_background: false,
            blur_background_frame: false,
            blur_background_fixed: false,
            blur_background_blacklist: ConditionList::new(),
            blur_kerns: Vec::new(),
            blur_kern_has_negative: false,

            backend: Backend::default(),
            vsync: VSyncMode::default(),
            refresh_rate: 0,
            sw_opti: false,
            resize_damage: 0,
            glx_no_stencil: false,
            glx_no_rebind_pixmap: false,
            glx_swap_method: GlxSwapMethod::default(),
            glx_use_gpushader4: false,
            xrender_sync: false,
            xrender_sync_fence: false,

            unredir_if_possible: false,
            unredir_if_possible_delay: 0,
            unredir_if_possible_blacklist: ConditionList::new(),

            log_level: None,

            wintype_option: [WinOption::default(); NUM_WINTYPES],
        }
    }
}
