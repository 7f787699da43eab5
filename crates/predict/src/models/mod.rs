mod fill_mask;
mod generation;
mod llama3_chat;

pub use fill_mask::FillMaskModel;
pub use generation::GenerationModel;
pub use llama3_chat::{Llama3ChatModel, SUPPORTED_LLAMA3_MODELS};

use rand::SeedableRng;
use rand::rngs::StdRng;

pub(crate) fn sampling_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
