//! Read-only and maintenance commands: `status`, `show`, `list`, `render`
//! and `sweep`.

use super::{open_service, parse_object, print_json};
use crate::cli::{ObjectArgs, RenderArgs, SweepArgs, UserObjectArgs};
use crate::context::StoreContext;
use crate::error::{LockingError, Result};
use crate::locks::{Lock, LockStatus, User};
use chrono::Duration;
use serde_json::json;

pub fn cmd_status(ctx: &StoreContext, args: &UserObjectArgs) -> Result<()> {
    print_json(&run_status(ctx, args)?)
}

/// Execute `softlock show`: the stored row, verbatim.
pub fn cmd_show(ctx: &StoreContext, args: &ObjectArgs) -> Result<()> {
    print_json(&run_show(ctx, args)?)
}

pub fn cmd_list(ctx: &StoreContext) -> Result<()> {
    print_json(&open_service(ctx)?.list()?)
}

/// Execute `softlock render`. Prints the markup as-is, which is an empty
/// line when the object is not locked.
pub fn cmd_render(ctx: &StoreContext, args: &RenderArgs) -> Result<()> {
    println!("{}", run_render(ctx, args)?);
    Ok(())
}

pub fn cmd_sweep(ctx: &StoreContext, args: &SweepArgs) -> Result<()> {
    let removed = run_sweep(ctx, args)?;
    print_json(&json!({ "removed": removed }))
}

pub(super) fn run_status(ctx: &StoreContext, args: &UserObjectArgs) -> Result<LockStatus> {
    let object = parse_object(&args.object)?;
    let viewer = User::try_new(args.user.as_str(), "")?;
    open_service(ctx)?.lock_status(&object, &viewer.id)
}

pub(super) fn run_show(ctx: &StoreContext, args: &ObjectArgs) -> Result<Lock> {
    let object = parse_object(&args.object)?;
    open_service(ctx)?.manager().get_lock_for_object(&object)
}

pub(super) fn run_render(ctx: &StoreContext, args: &RenderArgs) -> Result<String> {
    let object = parse_object(&args.object)?;
    let viewer = User::try_new(args.viewer.as_str(), "")?;
    open_service(ctx)?.render_admin_status(&object, &viewer.id)
}

pub(super) fn run_sweep(ctx: &StoreContext, args: &SweepArgs) -> Result<usize> {
    let grace = args
        .grace
        .map(|secs| {
            i64::try_from(secs)
                .ok()
                .and_then(Duration::try_seconds)
                .ok_or_else(|| {
                    LockingError::UserError(format!("sweep grace of {} seconds is too large", secs))
                })
        })
        .transpose()?;

    open_service(ctx)?.sweep(grace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::LockArgs;
    use crate::commands::edit::{run_lock, run_unlock};
    use crate::exit_codes;
    use crate::test_support::temp_store;

    fn lock(ctx: &StoreContext, object: &str, user: &str) {
        let args = LockArgs {
            object: object.to_string(),
            user: user.to_string(),
            name: String::new(),
            duration: None,
        };
        assert!(run_lock(ctx, &args).unwrap().acquired);
    }

    fn user_args(object: &str, user: &str) -> UserObjectArgs {
        UserObjectArgs {
            object: object.to_string(),
            user: user.to_string(),
        }
    }

    #[test]
    fn status_reflects_viewer() {
        let (_dir, ctx) = temp_store();
        lock(&ctx, "article:42", "ada");

        let own = run_status(&ctx, &user_args("article:42", "ada")).unwrap();
        assert!(own.is_owner);

        let other = run_status(&ctx, &user_args("article:42", "bob")).unwrap();
        assert!(other.locked);
        assert!(!other.is_owner);
        assert!(other.message.starts_with("Locked by ada for"));

        let never = run_status(&ctx, &user_args("article:7", "bob")).unwrap();
        assert!(!never.locked);
    }

    #[test]
    fn blank_viewer_is_a_user_error() {
        let (_dir, ctx) = temp_store();
        let err = run_status(&ctx, &user_args("article:42", "")).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);

        let args = RenderArgs {
            object: "article:42".to_string(),
            viewer: " ".to_string(),
        };
        assert_eq!(run_render(&ctx, &args).unwrap_err().exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn show_reports_missing_row() {
        let (_dir, ctx) = temp_store();
        let args = ObjectArgs {
            object: "article:42".to_string(),
        };

        let err = run_show(&ctx, &args).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::NOT_PERMITTED);

        lock(&ctx, "article:42", "ada");
        let row = run_show(&ctx, &args).unwrap();
        assert_eq!(row.locked_by.map(|u| u.id), Some("ada".to_string()));
        assert!(row.version > 0);
    }

    #[test]
    fn render_prints_nothing_for_unlocked_objects() {
        let (_dir, ctx) = temp_store();
        let args = RenderArgs {
            object: "article:42".to_string(),
            viewer: "bob".to_string(),
        };
        assert_eq!(run_render(&ctx, &args).unwrap(), "");

        lock(&ctx, "article:42", "ada");
        let markup = run_render(&ctx, &args).unwrap();
        assert!(markup.contains("locking-locked"));
        assert!(markup.contains(r#"data-lock-id="article:42""#));
    }

    #[test]
    fn sweep_with_zero_grace_keeps_active_locks() {
        let (_dir, ctx) = temp_store();
        lock(&ctx, "article:1", "ada");
        lock(&ctx, "article:2", "bob");
        run_unlock(&ctx, &user_args("article:2", "bob")).unwrap();

        assert_eq!(run_sweep(&ctx, &SweepArgs { grace: Some(0) }).unwrap(), 1);

        let remaining = open_service(&ctx).unwrap().list().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].object, "article:1");
    }

    #[test]
    fn oversized_grace_is_rejected() {
        let (_dir, ctx) = temp_store();
        let err = run_sweep(&ctx, &SweepArgs { grace: Some(u64::MAX) }).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }
}
