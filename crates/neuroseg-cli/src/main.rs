mod command;
mod plot;
mod schema;
mod util;

fn main() -> anyhow::Result<()> {
    command::run()
}
