//! Post a comment to a running server

use anyhow::{bail, Result};
use std::time::Duration;

use crate::comments::{CommentClient, CommentForm, SubmitOutcome};

/// Submit one comment the way the browser form does
pub async fn run(server: &str, slug: &str, name: &str, comment: &str, timeout: Duration) -> Result<()> {
    let client = CommentClient::new(server, timeout)?;

    let mut form = CommentForm::new(slug);
    form.set_name(name);
    form.set_comment(comment);

    match client.submit_form(&mut form).await {
        Some(SubmitOutcome::Success) => {
            println!("Thanks for your comment!");
            Ok(())
        }
        Some(SubmitOutcome::Failure) => {
            bail!("Your comment could not be posted. Please try again.")
        }
        None => bail!("Both a name and a comment are required"),
    }
}
