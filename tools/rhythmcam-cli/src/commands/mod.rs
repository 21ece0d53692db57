pub mod align;
pub mod beats;
pub mod check;
pub mod zoom;

/// Print a result as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
