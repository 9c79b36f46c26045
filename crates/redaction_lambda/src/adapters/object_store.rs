use redaction_core::contract::OriginObject;

pub trait ObjectStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<OriginObject, String>;

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        content_type: Option<&str>,
    ) -> Result<(), String>;
}
