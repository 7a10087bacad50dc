//! Chefpup binary entry point.
//!
//! Everything, including argument parsing, lives in the library crate.

fn main() -> anyhow::Result<()> {
    chefpup_lib::run()
}
