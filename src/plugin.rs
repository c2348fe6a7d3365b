//! Plugin wiring for the sculpting core.

use bevy::prelude::*;

use crate::config::BrushSettings;

/// Plugin that adds volumetric sculpting support to Bevy.
///
/// This plugin registers:
/// - [`BrushSettings`] as a resource for the UI collaborator to edit
///
/// The session itself is constructed by the host application, since it owns
/// the choice of [`GeometryWorker`](crate::worker::GeometryWorker) and
/// [`ActionLog`](crate::actions::ActionLog).
///
/// # Example
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_carver::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(CarverPlugin)
///     .run();
/// ```
pub struct CarverPlugin;

impl Plugin for CarverPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<BrushSettings>();
    }
}
