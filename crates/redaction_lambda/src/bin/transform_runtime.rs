use aws_sdk_s3::primitives::ByteStream;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use redaction_core::contract::{OriginObject, ResultBody, TransformResult};
use redaction_lambda::adapters::log::JsonLineLog;
use redaction_lambda::adapters::object_store::ObjectStore;
use redaction_lambda::adapters::origin::PresignedUrlFetcher;
use redaction_lambda::adapters::response_writer::{ResponseWriter, WriteBackTarget};
use redaction_lambda::config::RuntimeConfig;
use redaction_lambda::handlers::http::handle_http_event;
use redaction_lambda::handlers::object_created::{
    handle_object_created_event, ObjectCreatedConfig,
};
use redaction_lambda::handlers::object_lambda::handle_object_lambda_event;
use redaction_lambda::handlers::{classify_event, EventKind};
use serde_json::Value;

struct S3ObjectStore {
    s3_client: aws_sdk_s3::Client,
}

impl ObjectStore for S3ObjectStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<OriginObject, String> {
        let bucket = bucket.to_string();
        let object_key = key.to_string();
        let client = self.s3_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .get_object()
                    .bucket(bucket)
                    .key(object_key)
                    .send()
                    .await
                    .map_err(|error| format!("failed to read object from s3: {error}"))?;
                let content_type = output.content_type().map(str::to_string);
                let body = output
                    .body
                    .collect()
                    .await
                    .map_err(|error| format!("failed to read s3 object body: {error}"))?;

                Ok::<_, String>(OriginObject {
                    body: body.into_bytes().to_vec(),
                    content_type,
                })
            })
        })
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        content_type: Option<&str>,
    ) -> Result<(), String> {
        let bucket = bucket.to_string();
        let object_key = key.to_string();
        let body_bytes = body.to_vec();
        let content_type = content_type.map(str::to_string);
        let client = self.s3_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .put_object()
                    .bucket(bucket)
                    .key(object_key)
                    .set_content_type(content_type)
                    .body(ByteStream::from(body_bytes))
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to write object to s3: {error}"))
            })
        })
    }
}

struct S3ResponseWriter {
    s3_client: aws_sdk_s3::Client,
}

impl ResponseWriter for S3ResponseWriter {
    fn write_response(
        &self,
        target: WriteBackTarget,
        result: &TransformResult,
    ) -> Result<(), String> {
        let client = self.s3_client.clone();
        let status_code = i32::from(result.status_code);
        let content_type = result.content_type.clone();
        let body_bytes = result.payload_bytes();
        let (error_code, error_message) = match &result.body {
            ResultBody::Data(_) => (None, None),
            ResultBody::Error(message) => (Some("InternalError".to_string()), Some(message.clone())),
        };

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .write_get_object_response()
                    .request_route(target.route)
                    .request_token(target.token.as_str())
                    .status_code(status_code)
                    .content_type(content_type)
                    .set_error_code(error_code)
                    .set_error_message(error_message)
                    .body(ByteStream::from(body_bytes))
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to write get object response: {error}"))
            })
        })
    }
}

async fn handle_request(event: LambdaEvent<Value>) -> Result<Value, Error> {
    let config = RuntimeConfig::from_env().map_err(|error| Error::from(error.to_string()))?;
    let policy = config.policy.build();

    match classify_event(&event.payload) {
        EventKind::ObjectLambda => {
            let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            let writer = S3ResponseWriter {
                s3_client: aws_sdk_s3::Client::new(&aws_config),
            };
            let fetcher = PresignedUrlFetcher::new(config.fetch_timeout).map_err(Error::from)?;

            let response = handle_object_lambda_event(
                event.payload,
                policy.as_ref(),
                &fetcher,
                &writer,
                &JsonLineLog::new("object_lambda_handler"),
            )
            .map_err(|error| Error::from(error.message().to_string()))?;
            serde_json::to_value(response)
                .map_err(|error| Error::from(format!("failed to serialize response: {error}")))
        }
        EventKind::ObjectCreated => {
            let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            let store = S3ObjectStore {
                s3_client: aws_sdk_s3::Client::new(&aws_config),
            };
            let created_config = ObjectCreatedConfig {
                output_bucket: config.output_bucket.clone(),
                output_prefix: config.output_prefix.clone(),
            };

            let response = handle_object_created_event(
                event.payload,
                &created_config,
                policy.as_ref(),
                &store,
                &JsonLineLog::new("object_created_handler"),
            )
            .map_err(Error::from)?;
            serde_json::to_value(response)
                .map_err(|error| Error::from(format!("failed to serialize response: {error}")))
        }
        EventKind::Http => {
            let fetcher = PresignedUrlFetcher::new(config.fetch_timeout).map_err(Error::from)?;
            let response = handle_http_event(
                event.payload,
                &event.context.request_id,
                &config.origin_allow_list,
                policy.as_ref(),
                &fetcher,
                &JsonLineLog::new("http_handler"),
            );
            serde_json::to_value(response)
                .map_err(|error| Error::from(format!("failed to serialize api response: {error}")))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
