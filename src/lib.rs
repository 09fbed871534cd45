pub mod log {
    pub use vigil_log::*;
}

pub mod pal {
    pub mod prelude {
        pub use vigil_pal::prelude::*;
    }

    pub use vigil_pal::*;
}
