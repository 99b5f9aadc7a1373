//! CenterOS core: the window manager, the application host contract, and the
//! night-shift economy simulation that drives them. A frontend embeds
//! [`runtime::Runtime`], feeds it real elapsed time and input events, and
//! hands it a [`canvas::Canvas`] to draw each frame.

pub mod canvas;
pub mod desktop;
pub mod desktop_apps;
pub mod runtime;
pub mod sched;
pub mod shell;
pub mod sim;
pub mod trace;
pub mod windows;

pub use canvas::Canvas;
pub use desktop::{CursorHint, WindowId, WindowManager, WindowSummary};
pub use runtime::{Runtime, FIXED_STEP};
pub use sched::TaskQueue;
pub use shell::{Shell, ShellAction, TaskbarEdge};
pub use sim::{Clock, SimConfig, SimState, WorldHooks};
pub use trace::TraceMachine;
pub use windows::{
    AppContext, AppDescriptor, AppRegistry, Application, KeyEvent, LaunchData, LaunchRequest, Rect,
};

pub const OS_NAME: &str = "CenterOS";
pub const OS_VERSION: &str = "0.3.0";
