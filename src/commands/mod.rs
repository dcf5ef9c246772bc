pub mod inspect;
pub mod split;
