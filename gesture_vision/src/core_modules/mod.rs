pub mod classifier;
pub mod estimator;
pub mod finger_pose;
pub mod gesture_descriptor;
pub mod landmark;
pub mod overlay;
pub mod replay;
pub mod session;
pub mod synthetic;
pub mod utils;
