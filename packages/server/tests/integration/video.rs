use serde_json::json;

use crate::common::{MAX_VIDEO_SIZE, TestApp, routes, video_bytes};

mod upload_videos {
    use super::*;

    #[tokio::test]
    async fn upload_stores_blob_under_owner_log_and_set_key() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let user_id = app.user_id(&token).await;
        let id = app.create_workout_log(&token).await;
        let data = video_bytes(1000);

        let res = app
            .upload_videos(&routes::video_upload(id), &[("e1.s1.MP4", data.clone())], &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.bytes.is_empty());
        assert_eq!(app.blobs.keys(), vec![format!("{user_id}/{id}/e1.s1.mp4")]);

        let log = app.get_with_token(&routes::workout_log(id), &token).await;
        assert_eq!(
            log.body["exercises"][0]["sets"][0]["formVideo"],
            json!({"size": 1000, "extension": "mp4"})
        );
    }

    #[tokio::test]
    async fn batch_with_a_malformed_filename_writes_nothing() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let id = app.create_workout_log(&token).await;

        let res = app
            .upload_videos(
                &routes::video_upload(id),
                &[("e1.s1.mp4", video_bytes(10)), ("bad.name", video_bytes(10))],
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert!(app.blobs.keys().is_empty());
        let log = app.get_with_token(&routes::workout_log(id), &token).await;
        assert!(log.body["exercises"][0]["sets"][0].get("formVideo").is_none());
    }

    #[tokio::test]
    async fn batch_naming_an_unknown_set_writes_nothing() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let id = app.create_workout_log(&token).await;

        let res = app
            .upload_videos(
                &routes::video_upload(id),
                &[("e1.s1.mp4", video_bytes(10)), ("e1.s7.mp4", video_bytes(10))],
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert!(res.body["message"].as_str().unwrap().contains("s7"));
        assert!(app.blobs.keys().is_empty());
    }

    #[tokio::test]
    async fn disallowed_extension_and_empty_files_are_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let id = app.create_workout_log(&token).await;

        let gif = app
            .upload_videos(&routes::video_upload(id), &[("e1.s1.gif", video_bytes(10))], &token)
            .await;
        let empty = app
            .upload_videos(&routes::video_upload(id), &[("e1.s1.mp4", Vec::new())], &token)
            .await;

        assert_eq!(gif.status, 400);
        assert_eq!(empty.status, 400);
        assert!(app.blobs.keys().is_empty());
    }

    #[tokio::test]
    async fn request_without_video_files_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let id = app.create_workout_log(&token).await;

        let res = app.upload_videos(&routes::video_upload(id), &[], &token).await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn more_files_than_the_batch_limit_are_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let id = app.create_workout_log(&token).await;

        let files: Vec<(&str, Vec<u8>)> = (0..6).map(|_| ("e1.s1.mp4", video_bytes(4))).collect();
        let res = app.upload_videos(&routes::video_upload(id), &files, &token).await;

        assert_eq!(res.status, 400);
        assert!(app.blobs.keys().is_empty());
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let id = app.create_workout_log(&token).await;

        let res = app
            .upload_videos(
                &routes::video_upload(id),
                &[("e1.s1.mp4", video_bytes(MAX_VIDEO_SIZE as usize + 1))],
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert!(app.blobs.keys().is_empty());
    }

    #[tokio::test]
    async fn cannot_upload_to_another_users_log() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;
        let id = app.create_workout_log(&alice).await;

        let res = app
            .upload_videos(&routes::video_upload(id), &[("e1.s1.mp4", video_bytes(10))], &bob)
            .await;

        assert_eq!(res.status, 404);
        assert!(app.blobs.keys().is_empty());
    }

    #[tokio::test]
    async fn replacing_with_another_extension_removes_the_old_blob() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let user_id = app.user_id(&token).await;
        let id = app.create_workout_log(&token).await;

        app.upload_videos(&routes::video_upload(id), &[("e1.s1.mp4", video_bytes(10))], &token)
            .await;
        let res = app
            .upload_videos(&routes::video_upload(id), &[("e1.s1.webm", video_bytes(20))], &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(app.blobs.keys(), vec![format!("{user_id}/{id}/e1.s1.webm")]);
        let log = app.get_with_token(&routes::workout_log(id), &token).await;
        assert_eq!(
            log.body["exercises"][0]["sets"][0]["formVideo"],
            json!({"size": 20, "extension": "webm"})
        );
    }

    #[tokio::test]
    async fn removal_of_the_replaced_blob_is_retried() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let user_id = app.user_id(&token).await;
        let id = app.create_workout_log(&token).await;
        app.upload_videos(&routes::video_upload(id), &[("e1.s1.mp4", video_bytes(10))], &token)
            .await;

        app.blobs.fail_next_deletes(1);
        let res = app
            .upload_videos(&routes::video_upload(id), &[("e1.s1.webm", video_bytes(20))], &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(app.blobs.keys(), vec![format!("{user_id}/{id}/e1.s1.webm")]);
        assert_eq!(app.blobs.delete_calls(), 2);
    }

    #[tokio::test]
    async fn replaced_blob_that_cannot_be_removed_fails_the_upload() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let user_id = app.user_id(&token).await;
        let id = app.create_workout_log(&token).await;
        app.upload_videos(&routes::video_upload(id), &[("e1.s1.mp4", video_bytes(10))], &token)
            .await;

        app.blobs.fail_deletes(true);
        let res = app
            .upload_videos(&routes::video_upload(id), &[("e1.s1.webm", video_bytes(20))], &token)
            .await;

        assert_eq!(res.status, 500);
        assert_eq!(res.body["code"], "INTERNAL_ERROR");
        assert!(app.blobs.keys().contains(&format!("{user_id}/{id}/e1.s1.mp4")));

        let log = app.get_with_token(&routes::workout_log(id), &token).await;
        assert_eq!(
            log.body["exercises"][0]["sets"][0]["formVideo"],
            json!({"size": 20, "extension": "webm"})
        );
        let video = app
            .get_with_token(&routes::set_video(id, "e1", "s1"), &token)
            .await;
        assert_eq!(video.status, 200);
        assert_eq!(video.bytes, video_bytes(20));
    }

    #[tokio::test]
    async fn failed_upload_mid_batch_keeps_metadata_for_written_blobs_only() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let user_id = app.user_id(&token).await;
        let id = app.create_workout_log(&token).await;

        app.blobs.fail_puts_after(1);
        let res = app
            .upload_videos(
                &routes::video_upload(id),
                &[("e1.s1.mp4", video_bytes(10)), ("e1.s2.mp4", video_bytes(10))],
                &token,
            )
            .await;

        assert_eq!(res.status, 500);
        assert_eq!(app.blobs.keys(), vec![format!("{user_id}/{id}/e1.s1.mp4")]);

        let log = app.get_with_token(&routes::workout_log(id), &token).await;
        let sets = &log.body["exercises"][0]["sets"];
        assert_eq!(sets[0]["formVideo"]["size"], 10);
        assert!(sets[1].get("formVideo").is_none());
    }
}

mod stream_set_video {
    use super::*;

    async fn log_with_video(app: &TestApp, token: &str, len: usize) -> (uuid::Uuid, Vec<u8>) {
        let id = app.create_workout_log(token).await;
        let data = video_bytes(len);
        let res = app
            .upload_videos(&routes::video_upload(id), &[("e1.s1.mp4", data.clone())], token)
            .await;
        assert_eq!(res.status, 200, "upload failed: {}", res.text);
        (id, data)
    }

    #[tokio::test]
    async fn range_request_returns_partial_content() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let (id, data) = log_with_video(&app, &token, 1000).await;

        let res = app
            .get_range_with_token(&routes::set_video(id, "e1", "s1"), "bytes=0-99", &token)
            .await;

        assert_eq!(res.status, 206);
        assert_eq!(res.header("content-range"), Some("bytes 0-99/1000"));
        assert_eq!(res.header("content-length"), Some("100"));
        assert_eq!(res.header("accept-ranges"), Some("bytes"));
        assert_eq!(res.header("content-type"), Some("video/mp4"));
        assert_eq!(res.bytes, data[..100]);
    }

    #[tokio::test]
    async fn open_ended_range_runs_to_the_last_byte() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let (id, data) = log_with_video(&app, &token, 1000).await;

        let res = app
            .get_range_with_token(&routes::set_video(id, "e1", "s1"), "bytes=900-", &token)
            .await;

        assert_eq!(res.status, 206);
        assert_eq!(res.header("content-range"), Some("bytes 900-999/1000"));
        assert_eq!(res.bytes, data[900..]);
    }

    #[tokio::test]
    async fn range_end_past_the_object_is_clamped() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let (id, data) = log_with_video(&app, &token, 1000).await;

        let res = app
            .get_range_with_token(&routes::set_video(id, "e1", "s1"), "bytes=990-5000", &token)
            .await;

        assert_eq!(res.status, 206);
        assert_eq!(res.header("content-range"), Some("bytes 990-999/1000"));
        assert_eq!(res.header("content-length"), Some("10"));
        assert_eq!(res.bytes, data[990..]);
    }

    #[tokio::test]
    async fn request_without_range_returns_the_whole_video_as_attachment() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let (id, data) = log_with_video(&app, &token, 1000).await;

        let res = app
            .get_with_token(&routes::set_video(id, "e1", "s1"), &token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.header("content-length"), Some("1000"));
        assert!(res.header("content-range").is_none());
        let disposition = res.header("content-disposition").unwrap();
        assert!(disposition.starts_with("attachment;"));
        assert!(disposition.contains("filename=\"Squat_e1_s1.mp4\""));
        assert_eq!(res.bytes, data);
    }

    #[tokio::test]
    async fn unsatisfiable_ranges_answer_416_with_the_total_size() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let (id, _) = log_with_video(&app, &token, 1000).await;
        let path = routes::set_video(id, "e1", "s1");

        for range in ["bytes=1000-", "bytes=-100", "bytes=0-1,5-9", "bytes=50-10", "items=0-1"] {
            let res = app.get_range_with_token(&path, range, &token).await;
            assert_eq!(res.status, 416, "range {range}");
            assert_eq!(res.header("content-range"), Some("bytes */1000"), "range {range}");
        }
    }

    #[tokio::test]
    async fn set_without_video_is_404_with_empty_body_and_no_read() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let id = app.create_workout_log(&token).await;

        let res = app
            .get_with_token(&routes::set_video(id, "e1", "s1"), &token)
            .await;

        assert_eq!(res.status, 404);
        assert!(res.bytes.is_empty());
        assert_eq!(app.blobs.reads(), 0);
    }

    #[tokio::test]
    async fn unknown_set_is_404_with_empty_body() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let (id, _) = log_with_video(&app, &token, 10).await;

        let res = app
            .get_with_token(&routes::set_video(id, "e9", "s1"), &token)
            .await;

        assert_eq!(res.status, 404);
        assert!(res.bytes.is_empty());
    }

    #[tokio::test]
    async fn another_users_video_is_not_served() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice", "securepass").await;
        let bob = app.create_authenticated_user("bob", "securepass").await;
        let (id, _) = log_with_video(&app, &alice, 10).await;

        let res = app
            .get_with_token(&routes::set_video(id, "e1", "s1"), &bob)
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(app.blobs.reads(), 0);
    }

    #[tokio::test]
    async fn streaming_requires_a_token() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let (id, _) = log_with_video(&app, &token, 10).await;

        let res = app
            .get_without_token(&routes::set_video(id, "e1", "s1"))
            .await;

        assert_eq!(res.status, 401);
    }
}

mod delete_set_video {
    use super::*;

    #[tokio::test]
    async fn deleting_removes_blob_and_metadata() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let id = app.create_workout_log(&token).await;
        app.upload_videos(
            &routes::video_upload(id),
            &[("e1.s1.mp4", video_bytes(10)), ("e1.s2.mp4", video_bytes(10))],
            &token,
        )
        .await;

        let res = app.delete_with_token(&routes::set(id, "e1", "s1"), &token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body, json!({"setId": "s1", "exerciseId": "e1"}));
        assert_eq!(app.blobs.keys().len(), 1);
        assert!(app.blobs.keys()[0].ends_with("e1.s2.mp4"));

        let log = app.get_with_token(&routes::workout_log(id), &token).await;
        let sets = &log.body["exercises"][0]["sets"];
        assert!(sets[0].get("formVideo").is_none());
        assert!(sets[1]["formVideo"].is_object());

        let stream = app
            .get_with_token(&routes::set_video(id, "e1", "s1"), &token)
            .await;
        assert_eq!(stream.status, 404);
    }

    #[tokio::test]
    async fn set_without_video_is_404_and_touches_no_blob() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let id = app.create_workout_log(&token).await;

        let res = app.delete_with_token(&routes::set(id, "e1", "s1"), &token).await;

        assert_eq!(res.status, 404);
        assert!(res.bytes.is_empty());
        assert_eq!(app.blobs.delete_calls(), 0);
    }

    #[tokio::test]
    async fn second_delete_of_the_same_video_is_404() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let id = app.create_workout_log(&token).await;
        app.upload_videos(&routes::video_upload(id), &[("e1.s1.mp4", video_bytes(10))], &token)
            .await;

        let first = app.delete_with_token(&routes::set(id, "e1", "s1"), &token).await;
        let second = app.delete_with_token(&routes::set(id, "e1", "s1"), &token).await;

        assert_eq!(first.status, 200);
        assert_eq!(second.status, 404);
    }

    #[tokio::test]
    async fn failed_blob_delete_leaves_metadata_in_place() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let id = app.create_workout_log(&token).await;
        app.upload_videos(&routes::video_upload(id), &[("e1.s1.mp4", video_bytes(10))], &token)
            .await;

        app.blobs.fail_deletes(true);
        let res = app.delete_with_token(&routes::set(id, "e1", "s1"), &token).await;

        assert_eq!(res.status, 500);
        assert_eq!(app.blobs.keys().len(), 1);
        let log = app.get_with_token(&routes::workout_log(id), &token).await;
        assert!(log.body["exercises"][0]["sets"][0]["formVideo"].is_object());
    }
}

mod store_uploads {
    use ::common::storage::BlobStore;
    use formlog_server::entity::workout_log;
    use formlog_server::error::AppError;
    use formlog_server::workout::{UploadedVideo, plan_uploads, repository, store_uploads};
    use sea_orm::EntityTrait;

    use super::*;

    #[tokio::test]
    async fn failed_save_removes_every_blob_the_batch_wrote() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let user_id = app.user_id(&token).await;
        let id = app.create_workout_log(&token).await;
        app.upload_videos(&routes::video_upload(id), &[("e1.s1.mp4", video_bytes(10))], &token)
            .await;

        let mut log = repository::find_log(&app.db, id).await.unwrap();
        workout_log::Entity::delete_by_id(id)
            .exec(&app.db)
            .await
            .unwrap();

        let spool = tempfile::tempdir().unwrap();
        let mut files = Vec::new();
        for (name, len) in [("e1.s1.mp4", 30), ("e1.s2.mov", 5)] {
            let path = spool.path().join(name);
            std::fs::write(&path, video_bytes(len)).unwrap();
            files.push(UploadedVideo {
                filename: name.to_string(),
                path,
                size: len as u64,
            });
        }
        let plan = plan_uploads(&log, user_id, files).unwrap();

        let err = store_uploads(&app.db, &*app.blobs, &mut log, user_id, plan)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
        assert!(app.blobs.keys().is_empty());
    }

    #[tokio::test]
    async fn spooled_files_are_streamed_into_the_store() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "securepass").await;
        let user_id = app.user_id(&token).await;
        let id = app.create_workout_log(&token).await;
        let mut log = repository::find_log(&app.db, id).await.unwrap();

        let spool = tempfile::tempdir().unwrap();
        let path = spool.path().join("upload.part");
        std::fs::write(&path, video_bytes(300)).unwrap();
        let plan = plan_uploads(
            &log,
            user_id,
            vec![UploadedVideo {
                filename: "e1.s2.m4v".into(),
                path,
                size: 300,
            }],
        )
        .unwrap();

        store_uploads(&app.db, &*app.blobs, &mut log, user_id, plan)
            .await
            .unwrap();

        let key = format!("{user_id}/{id}/e1.s2.m4v");
        assert_eq!(app.blobs.inner.get(&key, None).await.unwrap(), video_bytes(300));
        let stored = repository::find_log(&app.db, id).await.unwrap();
        assert_eq!(stored.find_set("e1", "s2").unwrap().form_video.unwrap().size, 300);
    }
}
