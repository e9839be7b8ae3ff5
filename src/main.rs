use anyhow::Context;
use shellfyre::{Config, Interpreter, Options, Terminal};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let options: Options = argh::from_env();
    let config = Config::from(options);
    log::debug!("starting with {:?}", config);

    // A foreground child shares the terminal's Ctrl-C; the shell must outlive it.
    // Handlers are reset on exec, so children still get the default action.
    ctrlc::set_handler(|| {}).context("can't install the Ctrl-C handler")?;

    let mut interpreter = Interpreter::new(&config);
    let mut terminal = Terminal::new(config.history_size, interpreter.completions())
        .context("can't open the terminal")?;
    interpreter.repl(&mut terminal)?;

    println!();
    Ok(())
}
