use crate::error::{CheckError, TransportError};
use crate::helpers::interpret_certificate_error;
use crate::settings::TestTarget;
use crate::types::{AdSession, Directory, UserEntry};

/// Runs the whole check sequence against one target.
///
/// The sequence is linear and stops at the first failure, because each
/// step depends on the state the previous one established. Restore is
/// the one exception: once the temporary password is set, it runs even
/// when the second login check failed, so the directory is not left with
/// the temporary password. A restore failure fails the run on its own.
pub fn run_check<D: Directory>(
    directory: &D,
    target: &TestTarget,
    dump_entry: bool,
) -> Result<(), CheckError> {
    let mut admin = directory.open_admin(target).map_err(connection_error)?;

    check_naming_context(&mut admin, target)?;
    let user = search_target_user(&mut admin, target)?;
    if dump_entry {
        print!("{}", user.render());
    }

    login(directory, target, &user.dn, &target.user_pw, "first login")?;

    admin
        .change_password(&user.dn, &target.change_pw)
        .map_err(|e| CheckError::Failed(format!("set password failed: {e}")))?;

    let second_login = login(directory, target, &user.dn, &target.change_pw, "second login");
    let restore = admin
        .change_password(&user.dn, &target.user_pw)
        .map_err(|e| CheckError::Failed(format!("password restore failed: {e}")));

    match (second_login, restore) {
        (Ok(()), Ok(())) => Ok(()),
        (Err(CheckError::Failed(login_msg)), Err(CheckError::Failed(restore_msg))) => {
            Err(CheckError::Failed(format!("{login_msg}\n{restore_msg}")))
        }
        (Err(e), _) | (_, Err(e)) => Err(e),
    }
}

/// A connect/bind fault is an environment problem, with TLS certificate
/// mismatches rewritten into the friendlier diagnostic when possible.
fn connection_error(e: TransportError) -> CheckError {
    match interpret_certificate_error(&e.0) {
        Some(msg) => CheckError::Connection(msg),
        None => CheckError::Connection(e.0),
    }
}

fn check_naming_context(
    admin: &mut impl AdSession,
    target: &TestTarget,
) -> Result<(), CheckError> {
    let contexts = admin
        .naming_contexts()
        .map_err(|e| CheckError::Connection(e.0))?;
    if contexts.iter().any(|c| c == &target.base_dn) {
        return Ok(());
    }
    let mut lines = vec![
        format!(
            "the AD server does not have the naming context for {}",
            target.base_dn
        ),
        "supported naming contexts are:".to_string(),
    ];
    lines.extend(contexts);
    Err(CheckError::Failed(lines.join("\n")))
}

fn search_target_user(
    admin: &mut impl AdSession,
    target: &TestTarget,
) -> Result<UserEntry, CheckError> {
    let mut entries = admin
        .search(&target.base_dn, &target.filter)
        .map_err(|e| CheckError::Connection(e.0))?;
    match entries.len() {
        1 => Ok(entries.remove(0)),
        n => {
            let cardinality = if n == 0 {
                "no entry"
            } else {
                "more than one entry"
            };
            Err(CheckError::Failed(format!(
                "the search returned {cardinality}, but should return one user entry. \
                 Used filter: {}, BaseDN: {}",
                target.filter, target.base_dn
            )))
        }
    }
}

/// A failed login bind is the behavior under test, not an environment
/// problem.
fn login<D: Directory>(
    directory: &D,
    target: &TestTarget,
    dn: &str,
    password: &str,
    step: &str,
) -> Result<(), CheckError> {
    directory
        .login(target, dn, password)
        .map_err(|e| CheckError::Failed(format!("{step} failed for {dn}: {e}")))
}
