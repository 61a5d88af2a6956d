//! Route handlers, one module per resource.

pub mod comments;
pub mod dashboard;
pub mod health;
pub mod likes;
pub mod playlists;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;

/// Whether `email` looks like `local@domain.tld`.
pub(crate) fn is_valid_email(email: &str) -> bool {
  let Some((local, domain)) = email.split_once('@') else {
    return false;
  };
  !local.is_empty()
    && !domain.contains('@')
    && domain.split('.').count() >= 2
    && domain.split('.').all(|part| !part.is_empty())
    && !email.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
  use super::is_valid_email;

  #[test]
  fn email_shape() {
    assert!(is_valid_email("a@b.co"));
    assert!(!is_valid_email("a@b"));
    assert!(!is_valid_email("@b.co"));
    assert!(!is_valid_email("a@@b.co"));
    assert!(!is_valid_email("a b@c.io"));
    assert!(!is_valid_email("a@b..io"));
  }
}
