//! Prompt for a password and print its Argon2id hash for `--auth-password-hash`.

use std::process::ExitCode;

use dialoguer::Password;

use webstart::auth::password::hash_password;

fn main() -> ExitCode {
  match run() {
    Ok(hash) => {
      println!("\n\tPassword hash: {hash}");
      ExitCode::SUCCESS
    }
    Err(message) => {
      eprintln!("{message}");
      ExitCode::FAILURE
    }
  }
}

fn run() -> Result<String, String> {
  let password = Password::new()
    .with_prompt("   Enter password")
    .allow_empty_password(false)
    .interact()
    .map_err(|e| format!("could not get password: {e}"))?;

  let again = Password::new()
    .with_prompt("Re-Enter password")
    .allow_empty_password(true)
    .interact()
    .map_err(|e| format!("could not get re-entered password: {e}"))?;

  if password != again {
    return Err("passwords don't match".to_string());
  }

  hash_password(&password).map_err(|e| format!("error generating hash: {e}"))
}
