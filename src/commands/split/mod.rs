mod boundary;
mod emit;
mod locate;
mod recover;
mod run;
mod segment;

#[cfg(test)]
mod tests;

pub use run::run;

pub(crate) use locate::locate_sessions;
pub(crate) use segment::segment_page_text;
