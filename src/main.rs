//! gf binary entry point.

use gitfacade::ui::output;

fn main() {
    if let Err(err) = gitfacade::cli::run() {
        output::error(format!("{:#}", err));
        std::process::exit(1);
    }
}
