//! In-crate multi-task convolutional network: layers with hand-written
//! backward passes, the masked multi-task loss and Adam.

pub mod adam;
pub mod layers;
pub mod loss;
pub mod network;
pub mod tensor;

pub use adam::{Adam, AdamConfig};
pub use loss::{masked_bce_with_logits, multitask_loss, sigmoid, AUX_LOSS_WEIGHT};
pub use network::{MultiTaskCnn, NetworkConfig, DEFAULT_INPUT_LENGTH, HEADS};
pub use tensor::Tensor3;
