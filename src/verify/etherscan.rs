use crate::error::{Result, VerificationError};
use crate::utils::config::EtherscanConfig;
use crate::utils::error::compact_error_message;
use crate::utils::rpc::bounded_exponential_backoff_ms;
use crate::verify::{SourceVerification, VerificationBackend, VerifyOutcome};
use alloy::primitives::Address;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const RESPONSE_OK: &str = "1";
const PENDING_IN_QUEUE: &str = "pending in queue";
const CODE_FORMAT: &str = "solidity-standard-json-input";
const MAX_HTTP_RETRIES: u32 = 3;
const MAX_STATUS_POLLS: u32 = 100;
const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(3);
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const REASON_MAX_LEN: usize = 240;

#[derive(Debug, Deserialize)]
struct EtherscanResponse {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: serde_json::Value,
}

impl EtherscanResponse {
    fn is_ok(&self) -> bool {
        self.status == RESPONSE_OK
    }

    fn result_text(&self) -> String {
        match &self.result {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => self.message.clone(),
            other => other.to_string(),
        }
    }
}

/// Maps explorer free text onto an outcome. Only meaningful for responses
/// that are not a plain success.
pub fn classify_response(text: &str) -> VerifyOutcome {
    let lowered = text.to_ascii_lowercase();
    if lowered.contains("already verified") {
        return VerifyOutcome::AlreadyVerified;
    }
    if lowered.contains("unable to locate contractcode")
        || lowered.contains("does not have bytecode")
        || lowered.contains("has no bytecode")
    {
        return VerifyOutcome::BytecodeMissing;
    }
    if lowered.contains("pass - verified") {
        return VerifyOutcome::Verified;
    }
    VerifyOutcome::Failed(compact_error_message(text, REASON_MAX_LEN))
}

/// Etherscan-compatible `module=contract` verification API.
pub struct EtherscanClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    poll_interval: Duration,
}

impl EtherscanClient {
    pub fn new(config: &EtherscanConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| VerificationError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            poll_interval: STATUS_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    async fn call(&self, params: &[(&str, &str)]) -> Result<EtherscanResponse> {
        let mut form: Vec<(&str, &str)> = params.to_vec();
        form.push(("apikey", self.api_key.as_str()));
        self.post_with_retry(&form)
            .await
            .map_err(|e| VerificationError::Transport(compact_error_message(&e.to_string(), REASON_MAX_LEN)).into())
    }

    async fn post_with_retry(&self, form: &[(&str, &str)]) -> anyhow::Result<EtherscanResponse> {
        let mut last_err: Option<anyhow::Error> = None;
        for attempt in 0..MAX_HTTP_RETRIES {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(bounded_exponential_backoff_ms(
                    500,
                    attempt - 1,
                    4_000,
                )))
                .await;
            }
            match self.http.post(&self.api_url).form(form).send().await {
                Ok(resp) if resp.status().is_success() => match resp.json::<EtherscanResponse>().await {
                    Ok(parsed) => return Ok(parsed),
                    Err(e) => last_err = Some(e.into()),
                },
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!("HTTP {}: {}", status, body));
                }
                Err(e) => last_err = Some(e.into()),
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("etherscan: exhausted retries")))
    }

    /// Polls a `check*` action until the explorer leaves its queue.
    async fn poll_status(&self, action: &str, guid: &str) -> Result<VerifyOutcome> {
        for _ in 0..MAX_STATUS_POLLS {
            let response = self
                .call(&[("module", "contract"), ("action", action), ("guid", guid)])
                .await?;
            let text = response.result_text();
            if text.to_ascii_lowercase().contains(PENDING_IN_QUEUE) {
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }
            if response.is_ok() {
                return Ok(VerifyOutcome::Verified);
            }
            return Ok(classify_response(&text));
        }
        Ok(VerifyOutcome::Failed(format!(
            "{action} {guid} still pending after {MAX_STATUS_POLLS} checks"
        )))
    }
}

#[async_trait]
impl VerificationBackend for EtherscanClient {
    async fn verify_source(&self, request: &SourceVerification) -> Result<VerifyOutcome> {
        let address = format!("{:#x}", request.address);
        let contract_name = request.artifact.qualified_name();
        let constructor_args = hex::encode(&request.constructor_arguments);
        tracing::info!("[VERIFY] submitting {} at {}", contract_name, address);

        let response = self
            .call(&[
                ("module", "contract"),
                ("action", "verifysourcecode"),
                ("contractaddress", &address),
                ("sourceCode", &request.artifact.standard_json_input),
                ("codeformat", CODE_FORMAT),
                ("contractname", &contract_name),
                ("compilerversion", &request.artifact.compiler_version),
                // Etherscan's parameter name is misspelt.
                ("constructorArguements", &constructor_args),
            ])
            .await?;
        if !response.is_ok() {
            return Ok(classify_response(&response.result_text()));
        }
        self.poll_status("checkverifystatus", &response.result_text())
            .await
    }

    async fn link_proxy(&self, proxy: Address, implementation: Address) -> Result<VerifyOutcome> {
        let proxy = format!("{proxy:#x}");
        let implementation = format!("{implementation:#x}");
        let response = self
            .call(&[
                ("module", "contract"),
                ("action", "verifyproxycontract"),
                ("address", &proxy),
                ("expectedimplementation", &implementation),
            ])
            .await?;
        if !response.is_ok() {
            return Ok(classify_response(&response.result_text()));
        }
        self.poll_status("checkproxyverification", &response.result_text())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::VerificationArtifact;
    use alloy::primitives::Bytes;
    use std::sync::{Arc, Mutex};
    use crate::utils::test_http::{read_request, write_response};
    use tokio::net::TcpListener;

    /// Answers each connection with the next canned JSON body and records
    /// the request bodies it saw.
    async fn serve(responses: Vec<&'static str>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/api", listener.local_addr().unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        tokio::spawn(async move {
            for body in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let request = read_request(&mut socket).await;
                log.lock().unwrap().push(request);
                write_response(&mut socket, 200, body).await;
            }
        });
        (url, seen)
    }

    fn client(url: String) -> EtherscanClient {
        EtherscanClient::new(&EtherscanConfig {
            api_url: url,
            api_key: "KEY".to_string(),
        })
        .unwrap()
        .with_poll_interval(Duration::from_millis(10))
    }

    fn request() -> SourceVerification {
        SourceVerification {
            address: Address::repeat_byte(0xaa),
            constructor_arguments: Bytes::from(vec![0x01, 0x02]),
            artifact: VerificationArtifact {
                source_name: "contracts/Token.sol".to_string(),
                contract_name: "Token".to_string(),
                compiler_version: "v0.8.20+commit.a1b79de6".to_string(),
                standard_json_input: "{}".to_string(),
            },
        }
    }

    #[test]
    fn test_classify_response() {
        assert_eq!(
            classify_response("Contract source code already verified"),
            VerifyOutcome::AlreadyVerified
        );
        assert_eq!(
            classify_response("Unable to locate ContractCode at 0xabc"),
            VerifyOutcome::BytecodeMissing
        );
        assert_eq!(classify_response("Pass - Verified"), VerifyOutcome::Verified);
        assert!(matches!(
            classify_response("Fail - Unable to verify"),
            VerifyOutcome::Failed(_)
        ));
    }

    #[tokio::test]
    async fn test_verify_source_polls_until_verified() {
        let (url, seen) = serve(vec![
            r#"{"status":"1","message":"OK","result":"guid-123"}"#,
            r#"{"status":"0","message":"NOTOK","result":"Pending in queue"}"#,
            r#"{"status":"1","message":"OK","result":"Pass - Verified"}"#,
        ])
        .await;
        let outcome = client(url).verify_source(&request()).await.unwrap();
        assert_eq!(outcome, VerifyOutcome::Verified);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen[0].contains("action=verifysourcecode"));
        assert!(seen[0].contains("constructorArguements=0102"));
        assert!(seen[0].contains("apikey=KEY"));
        assert!(seen[2].contains("guid=guid-123"));
    }

    #[tokio::test]
    async fn test_verify_source_reports_missing_bytecode() {
        let (url, _) = serve(vec![
            r#"{"status":"0","message":"NOTOK","result":"Unable to locate ContractCode at 0xaaaa"}"#,
        ])
        .await;
        let outcome = client(url).verify_source(&request()).await.unwrap();
        assert_eq!(outcome, VerifyOutcome::BytecodeMissing);
    }

    #[tokio::test]
    async fn test_link_proxy_failure_carries_reason() {
        let (url, seen) = serve(vec![
            r#"{"status":"1","message":"OK","result":"guid-9"}"#,
            r#"{"status":"0","message":"NOTOK","result":"A corresponding implementation contract was unfortunately not detected"}"#,
        ])
        .await;
        let outcome = client(url)
            .link_proxy(Address::repeat_byte(0x01), Address::repeat_byte(0x02))
            .await
            .unwrap();
        assert!(matches!(outcome, VerifyOutcome::Failed(reason) if reason.contains("not detected")));
        assert!(seen.lock().unwrap()[1].contains("action=checkproxyverification"));
    }
}
