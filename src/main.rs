use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();

    match raman_dx::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
