use guarded_fetch_domain::url_policy::check_redirect_hop;
use guarded_fetch_domain::SecurityOptions;
use reqwest::redirect::Policy;
use tracing::{debug, warn};

/// Redirect policy that re-validates every hop before it is followed.
pub fn redirect_policy(options: SecurityOptions) -> Policy {
    Policy::custom(move |attempt| {
        let verdict = check_redirect_hop(attempt.url(), attempt.previous().len(), &options);
        match verdict {
            Ok(()) => {
                debug!(
                    to = %attempt.url(),
                    hop = attempt.previous().len(),
                    "Following redirect"
                );
                attempt.follow()
            }
            Err(e) => {
                warn!(to = %attempt.url(), error = %e, "Refusing redirect");
                attempt.error(e)
            }
        }
    })
}
