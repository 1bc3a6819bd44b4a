use ticketing::error::TicketingError;

use crate::cli::{Login, PasswordCommand};
use crate::get_runtime;

pub async fn login(login: Login) -> Result<(), TicketingError> {
    let runtime = get_runtime();
    let session = runtime
        .session_service()
        .login(&login.email, &login.password)
        .await?;
    match session.user {
        Some(user) => println!("Logged in as {} ({})", user.display_name(), user.role),
        None => println!("Logged in as {}", login.email),
    }
    Ok(())
}

pub fn logout() -> Result<(), TicketingError> {
    get_runtime().session_service().logout()?;
    println!("Logged out");
    Ok(())
}

pub async fn password(cmd: PasswordCommand) -> Result<(), TicketingError> {
    let runtime = get_runtime();
    let sessions = runtime.session_service();
    match cmd {
        PasswordCommand::Change { current, new } => {
            sessions.change_password(&current, &new).await?;
            println!("Password changed");
        }
        PasswordCommand::Forgot { email } => {
            sessions.forgot_password(&email).await?;
            println!("A reset link has been sent to {email} if the address is known");
        }
        PasswordCommand::Reset { token, new } => {
            sessions.reset_password(&token, &new).await?;
            println!("Password reset, you may now log in");
        }
    }
    Ok(())
}
