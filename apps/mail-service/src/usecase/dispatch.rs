//! # ディスパッチサービス
//!
//! フォーム送信を検証し、管理者宛メールと送信者への確認メールを送る。
//!
//! ## 処理の流れ
//!
//! ```text
//! ハニーポット検査 → 添付ファイル検証 → 配信プロファイル解決 → 変数構築
//!   → 管理者宛メール（失敗したら呼び出し全体が失敗）
//!   → 確認メール（テンプレートがある場合のみ。失敗してもログのみ）
//!   → 受付番号を返す
//! ```
//!
//! ## 設計方針
//!
//! - **管理者宛が本体**: 管理者宛メールのレンダリング・送信失敗は `ADMIN_SEND_FAILED`
//! - **確認メールはベストエフォート**: 管理者宛が届いた後の失敗で呼び出しを失敗に戻さない
//! - **依存性注入**: 送信とレンダリングは trait で抽象化し、テストでモックに差し替える

use std::sync::Arc;

use mailrelay_domain::{
    MailError,
    attachment::{ValidatedAttachment, validate_attachments},
    clock::Clock,
    delivery_profile::{DeliveryProfile, DeliveryProfileRegistry},
    notification::{EmailMessage, NotificationError, Sender},
    reference_number::ReferenceNumber,
    submission::Submission,
    template_variables::TemplateVariables,
};
use mailrelay_infra::notification::NotificationSender;
use mailrelay_shared::{
    event_log::{
        error::{category, kind},
        event,
    },
    log_business_event,
};

use super::MailRenderer;

/// ディスパッチサービス
pub struct DispatchService {
    sender:   Arc<dyn NotificationSender>,
    renderer: Arc<dyn MailRenderer>,
    profiles: Arc<DeliveryProfileRegistry>,
    clock:    Arc<dyn Clock>,
}

impl DispatchService {
    pub fn new(
        sender: Arc<dyn NotificationSender>,
        renderer: Arc<dyn MailRenderer>,
        profiles: Arc<DeliveryProfileRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sender,
            renderer,
            profiles,
            clock,
        }
    }

    /// フォーム送信をメールとして配信し、受付番号を返す
    ///
    /// 確認メールの成否は戻り値に影響しない。
    pub async fn dispatch(&self, submission: Submission) -> Result<ReferenceNumber, MailError> {
        let app_code = submission.app_code;
        let mail_type = submission.mail_type;

        if submission.is_honeypot_filled() {
            log_business_event!(
                event.category = event::category::MAIL,
                event.action = event::action::SPAM_REJECTED,
                event.result = event::result::FAILURE,
                event.app_code = %app_code,
                event.mail_type = %mail_type,
                "ハニーポットが埋められた送信を拒否"
            );
            return Err(MailError::SpamDetected);
        }

        let attachments = validate_attachments(&submission.attachments)?;
        for attachment in &submission.attachments {
            tracing::debug!(
                filename = %attachment.filename,
                extension = attachment.extension(),
                is_image = attachment.is_image(),
                "添付ファイルを受理"
            );
        }

        let profile = self.profiles.resolve(app_code, mail_type)?;
        let variables = TemplateVariables::build(&submission, self.clock.as_ref());
        let reference_number = variables.reference_number().clone();

        let admin_email = self
            .compose_admin_email(profile, &submission, &variables, attachments)
            .map_err(|e| admin_send_failed(&reference_number, e))?;
        self.sender
            .send_email(&admin_email)
            .await
            .map_err(|e| admin_send_failed(&reference_number, e))?;

        log_business_event!(
            event.category = event::category::MAIL,
            event.action = event::action::ADMIN_SENT,
            event.result = event::result::SUCCESS,
            event.app_code = %app_code,
            event.mail_type = %mail_type,
            event.reference_number = %reference_number,
            attachment_count = admin_email.attachments.len(),
            "管理者宛メール送信成功"
        );

        if let Some(template) = profile.confirmation_template_path() {
            self.send_confirmation(profile, template, &submission, &variables)
                .await;
        }

        Ok(reference_number)
    }

    /// 管理者宛メールを組み立てる
    ///
    /// 返信先は送信者のメールアドレス。
    fn compose_admin_email(
        &self,
        profile: &DeliveryProfile,
        submission: &Submission,
        variables: &TemplateVariables,
        attachments: Vec<ValidatedAttachment>,
    ) -> Result<EmailMessage, NotificationError> {
        let html_body = self.renderer.render(profile.template_path(), variables)?;

        Ok(EmailMessage {
            from: sender_of(profile),
            to: profile.to_addresses().to_vec(),
            cc: profile.cc_addresses().to_vec(),
            bcc: profile.bcc_addresses().to_vec(),
            reply_to: Some(submission.email.clone()),
            subject: profile.admin_subject(attachments.len()),
            html_body,
            text_body: variables.to_plain_text(),
            attachments,
        })
    }

    /// 確認メールを送る（失敗はログのみ）
    async fn send_confirmation(
        &self,
        profile: &DeliveryProfile,
        template: &str,
        submission: &Submission,
        variables: &TemplateVariables,
    ) {
        let reference_number = variables.reference_number();

        let result = match self.renderer.render(template, variables) {
            Ok(html_body) => {
                let email = EmailMessage {
                    from: sender_of(profile),
                    to: vec![submission.email.clone()],
                    cc: Vec::new(),
                    bcc: Vec::new(),
                    reply_to: Some(profile.confirmation_reply_to().to_string()),
                    subject: profile.confirmation_subject(),
                    html_body,
                    text_body: variables.to_plain_text(),
                    attachments: Vec::new(),
                };
                self.sender.send_email(&email).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                log_business_event!(
                    event.category = event::category::MAIL,
                    event.action = event::action::CONFIRMATION_SENT,
                    event.result = event::result::SUCCESS,
                    event.app_code = %profile.app_code(),
                    event.mail_type = %profile.mail_type(),
                    event.reference_number = %reference_number,
                    "確認メール送信成功"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error.category = category::EXTERNAL_SERVICE,
                    error.kind = error_kind(&e),
                    error = %e,
                    "確認メールを送信できなかったが、管理者宛メールは送信済み"
                );
                log_business_event!(
                    event.category = event::category::MAIL,
                    event.action = event::action::CONFIRMATION_FAILED,
                    event.result = event::result::FAILURE,
                    event.app_code = %profile.app_code(),
                    event.mail_type = %profile.mail_type(),
                    event.reference_number = %reference_number,
                    "確認メール送信失敗"
                );
            }
        }
    }
}

fn sender_of(profile: &DeliveryProfile) -> Sender {
    Sender {
        address: profile.from_address().to_string(),
        name:    profile.from_name().to_string(),
    }
}

fn error_kind(error: &NotificationError) -> &'static str {
    match error {
        NotificationError::SendFailed(_) => kind::SMTP,
        NotificationError::TemplateFailed(_) => kind::TEMPLATE,
    }
}

fn admin_send_failed(reference_number: &ReferenceNumber, error: NotificationError) -> MailError {
    tracing::error!(
        error.category = category::EXTERNAL_SERVICE,
        error.kind = error_kind(&error),
        reference_number = %reference_number,
        error = %error,
        "管理者宛メールの送信に失敗"
    );
    MailError::AdminSendFailed {
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
    use chrono::{TimeZone, Utc};
    use mailrelay_domain::{
        clock::FixedClock,
        delivery_profile::NewDeliveryProfile,
        submission::{AppCode, FileAttachment, MailType},
    };
    use mailrelay_infra::mock::MockNotificationSender;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{test_utils::CapturedLogs, usecase::TemplateRenderer};

    const SUBMITTER: &str = "jean@example.be";

    /// 指定したテンプレートだけレンダリングに失敗するレンダラー
    struct FailingRenderer {
        inner:   TemplateRenderer,
        failing: &'static str,
    }

    impl MailRenderer for FailingRenderer {
        fn render(
            &self,
            template: &str,
            variables: &TemplateVariables,
        ) -> Result<String, NotificationError> {
            if template == self.failing {
                return Err(NotificationError::TemplateFailed(template.to_string()));
            }
            self.inner.render(template, variables)
        }
    }

    fn contact_profile(confirmation: Option<&str>) -> DeliveryProfile {
        DeliveryProfile::new(NewDeliveryProfile {
            app_code: AppCode::Assurantis,
            mail_type: MailType::ContactForm,
            from_address: "contact@assurantis.be".to_string(),
            from_name: "Assurantis".to_string(),
            to_addresses: vec!["contact@assurantis.be".to_string()],
            cc_addresses: vec!["archive@assurantis.be".to_string()],
            bcc_addresses: Vec::new(),
            reply_to: None,
            subject: "Nouveau message de contact - Assurantis".to_string(),
            template_path: "email/assurantis/contact_admin".to_string(),
            confirmation_template_path: confirmation.map(ToString::to_string),
            active: true,
        })
    }

    fn make_registry(confirmation: Option<&str>) -> Arc<DeliveryProfileRegistry> {
        Arc::new(DeliveryProfileRegistry::new([contact_profile(confirmation)]).unwrap())
    }

    fn make_service_with(
        sender: MockNotificationSender,
        renderer: Arc<dyn MailRenderer>,
        confirmation: Option<&str>,
    ) -> DispatchService {
        DispatchService::new(
            Arc::new(sender),
            renderer,
            make_registry(confirmation),
            Arc::new(FixedClock::new(
                Utc.with_ymd_and_hms(2024, 12, 11, 10, 0, 0).unwrap(),
            )),
        )
    }

    fn make_service(sender: MockNotificationSender, confirmation: Option<&str>) -> DispatchService {
        make_service_with(
            sender,
            Arc::new(TemplateRenderer::new().unwrap()),
            confirmation,
        )
    }

    fn make_submission() -> Submission {
        Submission {
            app_code:        AppCode::Assurantis,
            mail_type:       MailType::ContactForm,
            name:            "Jean Dupont".to_string(),
            email:           SUBMITTER.to_string(),
            phone:           Some("+32 470 12 34 56".to_string()),
            message:         "Bonjour, je souhaite être recontacté.".to_string(),
            subject:         None,
            company:         None,
            website:         None,
            additional_data: BTreeMap::new(),
            attachments:     Vec::new(),
            recaptcha_token: None,
        }
    }

    fn pdf_attachment() -> FileAttachment {
        FileAttachment {
            filename:    "constat.pdf".to_string(),
            content:     BASE64.encode(b"%PDF-1.4 test"),
            mime_type:   "application/pdf".to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_確認テンプレートなしでは管理者宛のみ送信する() {
        let sender = MockNotificationSender::new();
        let service = make_service(sender.clone(), None);

        let reference = service.dispatch(make_submission()).await.unwrap();

        assert!(reference.as_str().starts_with("CNT-20241211-"));
        let sent = sender.sent_emails();
        assert_eq!(sent.len(), 1);
        let admin = &sent[0];
        assert_eq!(admin.to, vec!["contact@assurantis.be".to_string()]);
        assert_eq!(admin.cc, vec!["archive@assurantis.be".to_string()]);
        assert_eq!(admin.reply_to.as_deref(), Some(SUBMITTER));
        assert_eq!(admin.from.name, "Assurantis");
        assert_eq!(admin.subject, "Nouveau message de contact - Assurantis");
        assert!(admin.html_body.contains(reference.as_str()));
        assert!(admin.text_body.starts_with("Nouveau message de contact\n\n"));
    }

    #[tokio::test]
    async fn test_確認テンプレートありでは送信者にも送信する() {
        let sender = MockNotificationSender::new();
        let service = make_service(sender.clone(), Some("email/assurantis/contact_confirmation"));

        service.dispatch(make_submission()).await.unwrap();

        let sent = sender.sent_emails();
        assert_eq!(sent.len(), 2);
        let confirmation = &sent[1];
        assert_eq!(confirmation.to, vec![SUBMITTER.to_string()]);
        assert_eq!(
            confirmation.reply_to.as_deref(),
            Some("contact@assurantis.be")
        );
        assert_eq!(
            confirmation.subject,
            "Confirmation de votre message de contact - Assurantis"
        );
        assert!(confirmation.attachments.is_empty());
    }

    #[tokio::test]
    async fn test_添付ファイルは管理者宛のみに付き件名に件数が付く() {
        let sender = MockNotificationSender::new();
        let service = make_service(sender.clone(), Some("email/assurantis/contact_confirmation"));
        let mut submission = make_submission();
        submission.attachments = vec![pdf_attachment(), pdf_attachment()];

        service.dispatch(submission).await.unwrap();

        let sent = sender.sent_emails();
        assert_eq!(sent[0].attachments.len(), 2);
        assert_eq!(sent[0].attachments[0].content, b"%PDF-1.4 test".to_vec());
        assert_eq!(
            sent[0].subject,
            "Nouveau message de contact - Assurantis (2 pièce(s) jointe(s))"
        );
        assert!(sent[1].attachments.is_empty());
    }

    #[tokio::test]
    async fn test_ハニーポットが埋まっていたら何も送らない() {
        let sender = MockNotificationSender::new();
        let service = make_service(sender.clone(), Some("email/assurantis/contact_confirmation"));
        let mut submission = make_submission();
        submission.website = Some("http://spam.example".to_string());

        let err = service.dispatch(submission).await.unwrap_err();

        assert_eq!(err, MailError::SpamDetected);
        assert_eq!(sender.attempts(), 0);
    }

    #[tokio::test]
    async fn test_ハニーポットは添付ファイル検証より先に判定する() {
        let sender = MockNotificationSender::new();
        let service = make_service(sender.clone(), None);
        let mut submission = make_submission();
        submission.website = Some("x".to_string());
        submission.attachments = vec![FileAttachment {
            mime_type: "application/zip".to_string(),
            ..pdf_attachment()
        }];

        let err = service.dispatch(submission).await.unwrap_err();

        assert_eq!(err, MailError::SpamDetected);
    }

    #[tokio::test]
    async fn test_不正な添付ファイルでは送信しない() {
        let sender = MockNotificationSender::new();
        let service = make_service(sender.clone(), None);
        let mut submission = make_submission();
        submission.attachments = vec![FileAttachment {
            mime_type: "application/zip".to_string(),
            ..pdf_attachment()
        }];

        let err = service.dispatch(submission).await.unwrap_err();

        assert_eq!(
            err,
            MailError::InvalidFileType {
                mime_type: "application/zip".to_string(),
            }
        );
        assert_eq!(sender.attempts(), 0);
    }

    #[tokio::test]
    async fn test_プロファイル未定義はinvalid_argument() {
        let sender = MockNotificationSender::new();
        let service = make_service(sender.clone(), None);
        let mut submission = make_submission();
        submission.mail_type = MailType::NewsletterSubscription;

        let err = service.dispatch(submission).await.unwrap_err();

        assert_eq!(
            err,
            MailError::invalid_argument(
                "Configuration non trouvée pour ASSURANTIS / NEWSLETTER_SUBSCRIPTION"
            )
        );
        assert_eq!(sender.attempts(), 0);
    }

    #[tokio::test]
    async fn test_管理者宛の送信失敗はadmin_send_failedで確認メールも送らない() {
        let sender = MockNotificationSender::new();
        sender.fail_when_addressed_to("contact@assurantis.be");
        let service = make_service(sender.clone(), Some("email/assurantis/contact_confirmation"));

        let err = service.dispatch(make_submission()).await.unwrap_err();

        assert!(matches!(err, MailError::AdminSendFailed { .. }));
        assert_eq!(sender.attempts(), 1);
        assert!(sender.sent_emails().is_empty());
    }

    #[tokio::test]
    async fn test_管理者宛のレンダリング失敗もadmin_send_failed() {
        let sender = MockNotificationSender::new();
        let renderer = FailingRenderer {
            inner:   TemplateRenderer::new().unwrap(),
            failing: "email/assurantis/contact_admin",
        };
        let service = make_service_with(sender.clone(), Arc::new(renderer), None);

        let err = service.dispatch(make_submission()).await.unwrap_err();

        assert!(matches!(err, MailError::AdminSendFailed { .. }));
        assert_eq!(sender.attempts(), 0);
    }

    #[tokio::test]
    async fn test_管理者宛の失敗は原因の種別で記録する() {
        let (logs, _guard) = CapturedLogs::start();

        let renderer = FailingRenderer {
            inner:   TemplateRenderer::new().unwrap(),
            failing: "email/assurantis/contact_admin",
        };
        let render_failure =
            make_service_with(MockNotificationSender::new(), Arc::new(renderer), None);
        let _ = render_failure.dispatch(make_submission()).await;
        let render_logs = logs.contents();

        let sender = MockNotificationSender::new();
        sender.fail_when_addressed_to("contact@assurantis.be");
        let _ = make_service(sender, None).dispatch(make_submission()).await;
        let send_logs = logs.contents()[render_logs.len()..].to_string();

        assert!(render_logs.contains(r#"error.kind="template""#));
        assert!(!render_logs.contains(r#"error.kind="smtp""#));
        assert!(send_logs.contains(r#"error.kind="smtp""#));
    }

    #[tokio::test]
    async fn test_確認メールの送信失敗でも成功を返す() {
        let sender = MockNotificationSender::new();
        sender.fail_when_addressed_to(SUBMITTER);
        let service = make_service(sender.clone(), Some("email/assurantis/contact_confirmation"));

        let reference = service.dispatch(make_submission()).await;

        assert!(reference.is_ok());
        assert_eq!(sender.attempts(), 2);
        assert_eq!(sender.sent_emails().len(), 1);
    }

    #[tokio::test]
    async fn test_確認メールのレンダリング失敗でも成功を返す() {
        let sender = MockNotificationSender::new();
        let renderer = FailingRenderer {
            inner:   TemplateRenderer::new().unwrap(),
            failing: "email/assurantis/contact_confirmation",
        };
        let service = make_service_with(
            sender.clone(),
            Arc::new(renderer),
            Some("email/assurantis/contact_confirmation"),
        );

        let reference = service.dispatch(make_submission()).await.unwrap();

        let sent = sender.sent_emails();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].html_body.contains(reference.as_str()));
    }
}
