//! Impl the `serde::Serialize` and `serde::Deserialize` traits.

use crate::TronBuf;
use std::fmt::Formatter;

#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
impl serde::Serialize for TronBuf {
    #[inline]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        if serializer.is_human_readable() {
            let json = self.format(false).map_err(serde::ser::Error::custom)?;
            serializer.serialize_str(&json)
        } else {
            serializer.serialize_bytes(self.as_bytes())
        }
    }
}

#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
impl<'de> serde::Deserialize<'de> for TronBuf {
    #[inline]
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        struct TronBufVisitor;

        impl<'de> serde::de::Visitor<'de> for TronBufVisitor {
            type Value = TronBuf;

            #[inline]
            fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
                write!(formatter, "a tron document")
            }

            #[inline]
            fn visit_str<E>(self, v: &str) -> Result<TronBuf, E>
            where
                E: serde::de::Error,
            {
                TronBuf::parse(v).map_err(serde::de::Error::custom)
            }

            #[inline]
            fn visit_bytes<E>(self, v: &[u8]) -> Result<TronBuf, E>
            where
                E: serde::de::Error,
            {
                let mut buf = Vec::new();
                buf.try_reserve(v.len()).map_err(serde::de::Error::custom)?;
                buf.extend_from_slice(v);
                let tron = TronBuf::from_vec(buf);
                tron.document_type().map_err(serde::de::Error::custom)?;
                Ok(tron)
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(TronBufVisitor)
        } else {
            deserializer.deserialize_bytes(TronBufVisitor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde() {
        let tron_buf = TronBuf::parse(r#"[123, true, null, "abc", {"k": "b64:AQI="}]"#).unwrap();

        let bin = bincode::serialize(&tron_buf).unwrap();
        let bin_tron_buf: TronBuf = bincode::deserialize(&bin).unwrap();
        assert_eq!(bin_tron_buf, tron_buf);

        let text = serde_json::to_string(&tron_buf).unwrap();
        assert_eq!(text, r#""[123,true,null,\"abc\",{\"k\":\"b64:AQI=\"}]""#);
        let text_tron_buf: TronBuf = serde_json::from_str(&text).unwrap();
        assert_eq!(text_tron_buf, tron_buf);
    }

    #[test]
    fn test_deserialize_invalid_bytes() {
        let bin = bincode::serialize(&b"\x00JSON".to_vec()).unwrap();
        assert!(bincode::deserialize::<TronBuf>(&bin).is_err());
    }
}
