//! Account-deletion cascade: OTP-gated, removes every uploaded file the
//! account owns, then the owned rows and the account itself, then notifies
//! the admin inbox. File cleanup is best-effort; the row phase is a single
//! transaction.

use std::collections::BTreeSet;

use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::otp::{self, OtpPurpose},
    email,
    error::AppError,
    podcasts::repo::{Episode, Podcast},
    state::AppState,
    uploads,
    users::repo::User,
};

#[derive(Debug, Clone, Copy)]
pub struct CascadeOutcome {
    pub files_removed: usize,
    pub podcasts_removed: u64,
}

/// Collect every managed upload path tied to the account: profile picture,
/// each owned podcast's thumbnail and root media, and each episode's media.
/// External URLs are skipped; duplicates collapse so a file referenced from
/// two records is removed once.
pub fn collect_owned_files(
    profile_picture: &str,
    podcasts: &[Podcast],
    episodes: &[Episode],
) -> BTreeSet<String> {
    let mut files = BTreeSet::new();
    if uploads::is_managed(profile_picture) {
        files.insert(profile_picture.to_string());
    }
    for p in podcasts {
        for stored in [p.image.as_deref(), p.audio_url.as_deref(), p.video_url.as_deref()]
            .into_iter()
            .flatten()
        {
            if uploads::is_managed(stored) {
                files.insert(stored.to_string());
            }
        }
    }
    for e in episodes {
        for stored in [e.audio_url.as_deref(), e.video_url.as_deref()]
            .into_iter()
            .flatten()
        {
            if uploads::is_managed(stored) {
                files.insert(stored.to_string());
            }
        }
    }
    files
}

/// Run the cascade for `user_id`. Nothing is touched until the reason is
/// present and the deletion code checks out; after that, file cleanup is
/// best-effort and the row deletions are all-or-nothing.
pub async fn execute(
    state: &AppState,
    user_id: Uuid,
    supplied_otp: &str,
    reason: &str,
) -> Result<CascadeOutcome, AppError> {
    if supplied_otp.trim().is_empty() || reason.trim().is_empty() {
        return Err(AppError::Validation("Please provide OTP and reason".into()));
    }

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    otp::check(
        user.otp_code.as_deref(),
        user.otp_purpose,
        user.otp_expires_at,
        supplied_otp,
        OtpPurpose::Deletion,
        OffsetDateTime::now_utc(),
    )?;

    let podcasts = Podcast::list_by_user(&state.db, user_id).await?;
    let episodes = Episode::list_by_owner(&state.db, user_id).await?;
    let files = collect_owned_files(&user.profile_picture, &podcasts, &episodes);

    let mut files_removed = 0usize;
    for stored in &files {
        match uploads::remove_stored(&state.config.upload_root, stored).await {
            Ok(true) => {
                files_removed += 1;
                info!(path = %stored, "removed upload");
            }
            Ok(false) => {}
            Err(e) => warn!(path = %stored, error = %e, "failed to remove upload"),
        }
    }

    let mut tx = state.db.begin().await?;
    let podcasts_removed = sqlx::query(r#"DELETE FROM podcasts WHERE user_id = $1"#)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    email::notify_account_deleted(
        state.mailer.as_ref(),
        &state.config.smtp.admin_email,
        &user.username,
        &user.email,
        user.phone.as_deref(),
        reason,
    )
    .await;

    info!(
        user_id = %user_id,
        files_removed,
        podcasts_removed,
        "account deleted"
    );
    Ok(CascadeOutcome {
        files_removed,
        podcasts_removed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::podcasts::repo::MediaType;

    fn podcast(image: Option<&str>, audio: Option<&str>, video: Option<&str>) -> Podcast {
        Podcast {
            id: Uuid::new_v4(),
            legacy_id: None,
            title: "t".into(),
            author: None,
            user_id: Some(Uuid::new_v4()),
            description: None,
            image: image.map(String::from),
            category: None,
            language: "Hindi".into(),
            media_type: MediaType::Audio,
            audio_url: audio.map(String::from),
            video_url: video.map(String::from),
            views: 0,
            rating: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn episode(audio: Option<&str>, video: Option<&str>) -> Episode {
        Episode {
            id: Uuid::new_v4(),
            podcast_id: Uuid::new_v4(),
            legacy_id: None,
            title: None,
            description: None,
            duration: None,
            published: None,
            episode_number: None,
            audio_url: audio.map(String::from),
            video_url: video.map(String::from),
        }
    }

    #[test]
    fn collects_profile_podcast_and_episode_files() {
        let podcasts = vec![podcast(
            Some("/uploads/thumbnail/t.png"),
            Some("/uploads/audio/a.mp3"),
            None,
        )];
        let episodes = vec![episode(Some("/uploads/audio/ep1.mp3"), None)];
        let files = collect_owned_files("/uploads/pp.png", &podcasts, &episodes);
        assert_eq!(
            files.into_iter().collect::<Vec<_>>(),
            vec![
                "/uploads/audio/a.mp3",
                "/uploads/audio/ep1.mp3",
                "/uploads/pp.png",
                "/uploads/thumbnail/t.png",
            ]
        );
    }

    #[test]
    fn duplicate_references_collapse() {
        let podcasts = vec![
            podcast(Some("/uploads/thumbnail/shared.png"), Some("/uploads/audio/a.mp3"), None),
            podcast(Some("/uploads/thumbnail/shared.png"), None, None),
        ];
        let episodes = vec![episode(Some("/uploads/audio/a.mp3"), None)];
        let files = collect_owned_files("", &podcasts, &episodes);
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn external_urls_and_empty_paths_are_skipped() {
        let podcasts = vec![podcast(
            Some("https://cdn.example.com/cover.png"),
            None,
            None,
        )];
        let files = collect_owned_files("https://avatars.example.com/u.png", &podcasts, &[]);
        assert!(files.is_empty());
    }

    #[test]
    fn zero_content_user_enumerates_nothing() {
        assert!(collect_owned_files("", &[], &[]).is_empty());
    }
}
