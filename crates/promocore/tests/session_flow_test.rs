//! Integration tests for the administrator session flows
//!
//! Run with: cargo test -p promocore --test session_flow_test

mod common;

use common::{test_settings, TestApp, ADMIN};
use promocore::content::{AssetFile, NewItem};
use promocore::gateway::{CallToAction, Payload};
use promocore::session::{AdminInput, Committed, EditField, Outcome, Prompt, Rejection, SessionError};

fn text(s: &str) -> AdminInput {
    AdminInput::text(s)
}

fn photo(file_id: &str) -> AdminInput {
    AdminInput::Message(Payload::photo(file_id))
}

fn document(file_id: &str, name: &str) -> AdminInput {
    AdminInput::Message(Payload::document(file_id, Some(name.to_string())))
}

// ============================================================================
// Authoring
// ============================================================================

mod authoring_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_skipping_every_optional_step() {
        let app = TestApp::new();
        let engine = &app.engine;

        assert_eq!(engine.start_authoring(ADMIN).await.unwrap(), Outcome::Prompt(Prompt::ItemName));
        assert_eq!(
            engine.handle_input(ADMIN, text("Daily")).await.unwrap(),
            Outcome::Prompt(Prompt::ItemBody)
        );
        assert_eq!(
            engine.handle_input(ADMIN, text("Today's picks")).await.unwrap(),
            Outcome::Prompt(Prompt::ItemImage)
        );
        assert_eq!(
            engine.handle_input(ADMIN, AdminInput::Skip).await.unwrap(),
            Outcome::Prompt(Prompt::ItemAsset)
        );
        assert_eq!(
            engine.handle_input(ADMIN, AdminInput::Skip).await.unwrap(),
            Outcome::Prompt(Prompt::CtaLabel)
        );
        // Skipping the label commits without ever asking for a URL
        assert_eq!(
            engine.handle_input(ADMIN, AdminInput::Skip).await.unwrap(),
            Outcome::Committed(Committed::ItemCreated {
                name: "Daily".to_string()
            })
        );

        let item = app.content.get("Daily").await.unwrap().unwrap();
        assert_eq!(item.body, "Today's picks");
        assert_eq!(item.image, None);
        assert_eq!(item.asset, None);
        assert_eq!(item.call_to_action, None);
        assert!(!engine.has_session(ADMIN).await);
    }

    #[tokio::test]
    async fn test_full_authoring_with_button() {
        let app = TestApp::new();
        let engine = &app.engine;

        engine.start_authoring(ADMIN).await.unwrap();
        for input in [
            text("Express"),
            text("Three matches"),
            photo("photo-1"),
            document("doc-1", "slip.pdf"),
            text("Bet now"),
        ] {
            assert!(engine.handle_input(ADMIN, input).await.unwrap().keeps_session());
        }
        let outcome = engine
            .handle_input(ADMIN, text("https://example.com/bet"))
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Committed(Committed::ItemCreated { .. })));

        let item = app.content.get("Express").await.unwrap().unwrap();
        assert_eq!(item.image.as_deref(), Some("photo-1"));
        assert_eq!(item.asset, Some(AssetFile::new("doc-1", Some("slip.pdf".to_string()))));
        assert_eq!(
            item.call_to_action,
            Some(CallToAction::new("Bet now", "https://example.com/bet"))
        );
    }

    #[tokio::test]
    async fn test_cancel_at_every_state_leaves_nothing() {
        let steps = [
            text("Daily"),
            text("body"),
            photo("p"),
            document("d", "a.apk"),
            text("Label"),
        ];

        for depth in 0..=steps.len() {
            let app = TestApp::new();
            app.engine.start_authoring(ADMIN).await.unwrap();
            for input in steps.iter().take(depth) {
                app.engine.handle_input(ADMIN, input.clone()).await.unwrap();
            }

            assert_eq!(app.engine.cancel(ADMIN).await.unwrap(), Outcome::Cancelled);
            assert!(app.content.list_names().await.unwrap().is_empty(), "depth {}", depth);
            assert_eq!(
                app.engine.handle_input(ADMIN, text("late")).await.unwrap(),
                Outcome::Idle
            );
        }
    }

    #[tokio::test]
    async fn test_cancel_without_session_is_idle() {
        let app = TestApp::new();
        assert_eq!(app.engine.cancel(ADMIN).await.unwrap(), Outcome::Idle);
    }

    #[tokio::test]
    async fn test_name_validation() {
        let app = TestApp::new();
        app.content.create(NewItem::new("Taken", "x")).await.unwrap();
        app.engine.start_authoring(ADMIN).await.unwrap();

        let cases = [
            (AdminInput::Skip, Rejection::NotSkippable),
            (text("   "), Rejection::EmptyText),
            (photo("p"), Rejection::ExpectedText),
            (text(&"n".repeat(49)), Rejection::NameTooLong { max: 48 }),
            (text("Taken"), Rejection::DuplicateName("Taken".to_string())),
        ];
        for (input, reason) in cases {
            assert_eq!(
                app.engine.handle_input(ADMIN, input).await.unwrap(),
                Outcome::Rejected {
                    reason,
                    prompt: Prompt::ItemName
                }
            );
        }
        assert_eq!(
            app.engine.handle_input(ADMIN, text(&"n".repeat(48))).await.unwrap(),
            Outcome::Prompt(Prompt::ItemBody)
        );
    }

    #[tokio::test]
    async fn test_wrong_media_and_bad_url_reprompt() {
        let app = TestApp::new();
        app.engine.start_authoring(ADMIN).await.unwrap();
        app.engine.handle_input(ADMIN, text("Daily")).await.unwrap();
        app.engine.handle_input(ADMIN, text("body")).await.unwrap();

        assert_eq!(
            app.engine.handle_input(ADMIN, text("not a photo")).await.unwrap(),
            Outcome::Rejected {
                reason: Rejection::ExpectedPhoto,
                prompt: Prompt::ItemImage
            }
        );
        app.engine.handle_input(ADMIN, AdminInput::Skip).await.unwrap();
        assert_eq!(
            app.engine.handle_input(ADMIN, photo("p")).await.unwrap(),
            Outcome::Rejected {
                reason: Rejection::ExpectedDocument,
                prompt: Prompt::ItemAsset
            }
        );
        app.engine.handle_input(ADMIN, AdminInput::Skip).await.unwrap();
        app.engine.handle_input(ADMIN, text("Open")).await.unwrap();
        assert_eq!(
            app.engine.handle_input(ADMIN, text("example.com")).await.unwrap(),
            Outcome::Rejected {
                reason: Rejection::InvalidUrl,
                prompt: Prompt::CtaUrl
            }
        );

        // Skipping the URL after a label commits with no button at all
        app.engine.handle_input(ADMIN, AdminInput::Skip).await.unwrap();
        assert_eq!(app.content.get("Daily").await.unwrap().unwrap().call_to_action, None);
    }

    #[tokio::test]
    async fn test_duplicate_at_commit_asks_for_a_new_name() {
        let app = TestApp::new();
        app.engine.start_authoring(ADMIN).await.unwrap();
        app.engine.handle_input(ADMIN, text("Daily")).await.unwrap();
        app.engine.handle_input(ADMIN, text("body")).await.unwrap();
        app.engine.handle_input(ADMIN, AdminInput::Skip).await.unwrap();
        app.engine.handle_input(ADMIN, AdminInput::Skip).await.unwrap();

        // The name gets taken while the flow is still running
        app.content.create(NewItem::new("Daily", "other")).await.unwrap();

        assert_eq!(
            app.engine.handle_input(ADMIN, AdminInput::Skip).await.unwrap(),
            Outcome::Rejected {
                reason: Rejection::DuplicateName("Daily".to_string()),
                prompt: Prompt::ItemName
            }
        );
        assert_eq!(app.content.get("Daily").await.unwrap().unwrap().body, "other");
    }

    #[tokio::test]
    async fn test_new_flow_replaces_running_one() {
        let app = TestApp::new();
        app.engine.start_authoring(ADMIN).await.unwrap();
        app.engine.handle_input(ADMIN, text("Daily")).await.unwrap();

        app.engine.start_broadcast(ADMIN).await.unwrap();
        assert_eq!(
            app.engine.current_prompt(ADMIN).await,
            Some(Prompt::BroadcastMessage)
        );
    }
}

// ============================================================================
// Permissions and expiry
// ============================================================================

mod access_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[tokio::test]
    async fn test_non_admin_is_rejected_before_any_state() {
        let app = TestApp::new();
        let stranger = ADMIN + 1;

        assert!(matches!(
            app.engine.start_authoring(stranger).await,
            Err(SessionError::PermissionDenied)
        ));
        assert!(matches!(
            app.engine.start_broadcast(stranger).await,
            Err(SessionError::PermissionDenied)
        ));
        assert!(matches!(
            app.engine.handle_input(stranger, text("x")).await,
            Err(SessionError::PermissionDenied)
        ));
        assert!(!app.engine.has_session(stranger).await);
    }

    #[tokio::test]
    async fn test_stranger_cannot_touch_admin_session() {
        let app = TestApp::new();
        app.engine.start_authoring(ADMIN).await.unwrap();

        assert!(app.engine.cancel(ADMIN + 1).await.is_err());
        assert_eq!(app.engine.current_prompt(ADMIN).await, Some(Prompt::ItemName));
    }

    #[tokio::test]
    async fn test_unset_admin_disables_flows() {
        let mut settings = test_settings();
        settings.admin_id = 0;
        let app = TestApp::with_settings(settings);
        assert!(matches!(
            app.engine.start_authoring(0).await,
            Err(SessionError::PermissionDenied)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_expires_on_next_input() {
        let mut settings = test_settings();
        settings.session.idle_timeout_secs = 60;
        let app = TestApp::with_settings(settings);

        app.engine.start_authoring(ADMIN).await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(
            app.engine.handle_input(ADMIN, text("Daily")).await.unwrap(),
            Outcome::Prompt(Prompt::ItemBody)
        );

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(
            app.engine.handle_input(ADMIN, text("body")).await.unwrap(),
            Outcome::Expired
        );
        assert_eq!(
            app.engine.handle_input(ADMIN, text("body")).await.unwrap(),
            Outcome::Idle
        );
        assert!(app.content.list_names().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_drops_idle_sessions() {
        let mut settings = test_settings();
        settings.session.idle_timeout_secs = 60;
        let app = TestApp::with_settings(settings);

        app.engine.start_broadcast(ADMIN).await.unwrap();
        assert_eq!(app.engine.expire_idle().await, 0);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(app.engine.expire_idle().await, 1);
        assert!(!app.engine.has_session(ADMIN).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_never_expires() {
        let mut settings = test_settings();
        settings.session.idle_timeout_secs = 0;
        let app = TestApp::with_settings(settings);

        app.engine.start_authoring(ADMIN).await.unwrap();
        assert!(app.engine.spawn_sweeper().is_none());
        tokio::time::sleep(Duration::from_secs(86_400)).await;

        assert_eq!(app.engine.expire_idle().await, 0);
        assert_eq!(
            app.engine.handle_input(ADMIN, text("Daily")).await.unwrap(),
            Outcome::Prompt(Prompt::ItemBody)
        );
    }
}

// ============================================================================
// Edit and delete
// ============================================================================

mod edit_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn app_with_item() -> TestApp {
        let app = TestApp::new();
        let mut item = NewItem::new("Daily", "old body");
        item.image = Some("photo-1".to_string());
        item.call_to_action = Some(CallToAction::new("Go", "https://example.com"));
        app.content.create(item).await.unwrap();
        app
    }

    #[tokio::test]
    async fn test_edit_body_touches_only_body() {
        let app = app_with_item().await;
        assert_eq!(
            app.engine.start_edit(ADMIN, EditField::Body, "Daily").await.unwrap(),
            Outcome::Prompt(Prompt::ItemBody)
        );
        assert_eq!(
            app.engine.handle_input(ADMIN, text("new body")).await.unwrap(),
            Outcome::Committed(Committed::ItemUpdated {
                name: "Daily".to_string(),
                field: EditField::Body
            })
        );

        let item = app.content.get("Daily").await.unwrap().unwrap();
        assert_eq!(item.body, "new body");
        assert_eq!(item.image.as_deref(), Some("photo-1"));
        assert!(item.call_to_action.is_some());
    }

    #[tokio::test]
    async fn test_skip_clears_optional_field() {
        let app = app_with_item().await;
        app.engine.start_edit(ADMIN, EditField::Image, "Daily").await.unwrap();
        app.engine.handle_input(ADMIN, AdminInput::Skip).await.unwrap();
        assert_eq!(app.content.get("Daily").await.unwrap().unwrap().image, None);

        app.engine
            .start_edit(ADMIN, EditField::CallToAction, "Daily")
            .await
            .unwrap();
        app.engine.handle_input(ADMIN, AdminInput::Skip).await.unwrap();
        assert_eq!(app.content.get("Daily").await.unwrap().unwrap().call_to_action, None);
    }

    #[tokio::test]
    async fn test_edit_button_collects_label_then_url() {
        let app = app_with_item().await;
        app.engine
            .start_edit(ADMIN, EditField::CallToAction, "Daily")
            .await
            .unwrap();
        assert_eq!(
            app.engine.handle_input(ADMIN, text("Play")).await.unwrap(),
            Outcome::Prompt(Prompt::CtaUrl)
        );
        app.engine
            .handle_input(ADMIN, text("https://play.example.com"))
            .await
            .unwrap();
        assert_eq!(
            app.content.get("Daily").await.unwrap().unwrap().call_to_action,
            Some(CallToAction::new("Play", "https://play.example.com"))
        );
    }

    #[tokio::test]
    async fn test_edit_unknown_item_fails_at_start() {
        let app = TestApp::new();
        assert!(matches!(
            app.engine.start_edit(ADMIN, EditField::Body, "Nope").await,
            Err(SessionError::NotFound(ref name)) if name == "Nope"
        ));
        assert!(!app.engine.has_session(ADMIN).await);
    }

    #[tokio::test]
    async fn test_edit_of_vanished_item_aborts() {
        let app = app_with_item().await;
        app.engine.start_edit(ADMIN, EditField::Body, "Daily").await.unwrap();
        app.content.delete("Daily").await.unwrap();

        assert_eq!(
            app.engine.handle_input(ADMIN, text("new")).await.unwrap(),
            Outcome::Aborted(Rejection::UnknownItem("Daily".to_string()))
        );
        assert!(app.content.list_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let app = app_with_item().await;
        assert_eq!(
            app.engine.start_delete(ADMIN, None).await.unwrap(),
            Outcome::Prompt(Prompt::DeleteName)
        );
        assert_eq!(
            app.engine.handle_input(ADMIN, text("Nope")).await.unwrap(),
            Outcome::Rejected {
                reason: Rejection::UnknownItem("Nope".to_string()),
                prompt: Prompt::DeleteName
            }
        );
        assert_eq!(
            app.engine.handle_input(ADMIN, text("Daily")).await.unwrap(),
            Outcome::Prompt(Prompt::DeleteConfirm {
                name: "Daily".to_string()
            })
        );
        assert_eq!(
            app.engine.handle_input(ADMIN, text("yes")).await.unwrap(),
            Outcome::Rejected {
                reason: Rejection::ConfirmationRequired,
                prompt: Prompt::DeleteConfirm {
                    name: "Daily".to_string()
                }
            }
        );
        assert!(app.content.exists("Daily").await.unwrap());

        assert_eq!(
            app.engine.handle_input(ADMIN, AdminInput::Confirm).await.unwrap(),
            Outcome::Committed(Committed::ItemDeleted {
                name: "Daily".to_string()
            })
        );
        assert!(!app.content.exists("Daily").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_by_name_goes_straight_to_confirm() {
        let app = app_with_item().await;
        assert_eq!(
            app.engine.start_delete(ADMIN, Some("Daily")).await.unwrap(),
            Outcome::Prompt(Prompt::DeleteConfirm {
                name: "Daily".to_string()
            })
        );
        assert_eq!(app.engine.cancel(ADMIN).await.unwrap(), Outcome::Cancelled);
        assert!(app.content.exists("Daily").await.unwrap());
    }
}

// ============================================================================
// Shared asset
// ============================================================================

mod asset_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_asset_flow_checks_extension() {
        let app = TestApp::new();
        assert_eq!(
            app.engine.start_asset_config(ADMIN).await.unwrap(),
            Outcome::Prompt(Prompt::AssetFile {
                extension: Some("apk".to_string())
            })
        );
        assert_eq!(
            app.engine.handle_input(ADMIN, document("d1", "setup.exe")).await.unwrap(),
            Outcome::Rejected {
                reason: Rejection::WrongExtension {
                    expected: "apk".to_string()
                },
                prompt: Prompt::AssetFile {
                    extension: Some("apk".to_string())
                }
            }
        );
        assert_eq!(
            app.engine.handle_input(ADMIN, AdminInput::Skip).await.unwrap(),
            Outcome::Rejected {
                reason: Rejection::NotSkippable,
                prompt: Prompt::AssetFile {
                    extension: Some("apk".to_string())
                }
            }
        );
        assert_eq!(
            app.engine.handle_input(ADMIN, document("d2", "promo.apk")).await.unwrap(),
            Outcome::Prompt(Prompt::AssetDescription)
        );
        assert_eq!(
            app.engine.handle_input(ADMIN, text("Android app")).await.unwrap(),
            Outcome::Committed(Committed::AssetConfigured {
                file_name: Some("promo.apk".to_string())
            })
        );

        let config = app.content.asset_config().await.unwrap();
        assert_eq!(config.file, Some(AssetFile::new("d2", Some("promo.apk".to_string()))));
        assert_eq!(config.description, "Android app");
    }

    #[tokio::test]
    async fn test_any_document_when_extension_unset() {
        let mut settings = test_settings();
        settings.session.asset_extension = String::new();
        let app = TestApp::with_settings(settings);

        app.engine.start_asset_config(ADMIN).await.unwrap();
        assert_eq!(
            app.engine.handle_input(ADMIN, document("d1", "notes.txt")).await.unwrap(),
            Outcome::Prompt(Prompt::AssetDescription)
        );
        app.engine.handle_input(ADMIN, AdminInput::Skip).await.unwrap();
        assert!(app.content.asset_config().await.unwrap().is_available());
    }
}
