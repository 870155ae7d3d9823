use std::process::ExitCode;

fn main() -> ExitCode {
  match studymgr_core::run(
    std::env::args_os().collect()
  ) {
    | Ok(()) => ExitCode::SUCCESS,
    | Err(err) => {
      eprintln!("studymgr: {err:#}");
      ExitCode::FAILURE
    }
  }
}
