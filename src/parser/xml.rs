// SPDX-License-Identifier: Apache-2.0

use std::io::Read;

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::parser::error::{DecodeError, Result};
use crate::record::StorageBatch;
use crate::record::storage::STORAGE_ROOT_ELEMENT;

/// Decode a `<STORAGES>` XML export.
///
/// The root element name is checked before deserializing since the deserializer itself
/// accepts any root.
pub fn storage_records<R: Read>(mut input: R) -> Result<StorageBatch> {
    let mut doc = String::new();
    input.read_to_string(&mut doc)?;

    check_root(&doc)?;
    let batch = quick_xml::de::from_str(&doc)?;
    Ok(batch)
}

fn check_root(doc: &str) -> Result<()> {
    let mut reader = Reader::from_str(doc);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                let name = e.name();
                if name.as_ref() == STORAGE_ROOT_ELEMENT.as_bytes() {
                    return Ok(());
                }
                return Err(DecodeError::RootElement {
                    expected: STORAGE_ROOT_ELEMENT,
                    found: String::from_utf8_lossy(name.as_ref()).into_owned(),
                });
            }
            Event::Eof => return Err(DecodeError::MissingRoot),
            // declaration, comments, doctype, whitespace
            _ => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const EXPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<STORAGES>
  <STORAGE>
    <RECORD_ID>cesnet-storage-1</RECORD_ID>
    <CREATE_TIME>2018-09-04T12:00:00Z</CREATE_TIME>
    <STORAGE_SYSTEM>du.cesnet.cz</STORAGE_SYSTEM>
    <SITE>CESNET</SITE>
    <STORAGE_SHARE>home</STORAGE_SHARE>
    <STORAGE_MEDIA>disk</STORAGE_MEDIA>
    <FILE_COUNT>42</FILE_COUNT>
    <LOCAL_USER>jdoe</LOCAL_USER>
    <LOCAL_GROUP>users</LOCAL_GROUP>
    <USER_IDENTITY>/CN=Jane Doe</USER_IDENTITY>
    <GROUP>vo.example.org</GROUP>
    <SUBJECT_IDENTITY>ignored</SUBJECT_IDENTITY>
    <START_TIME>2018-09-03T12:00:00Z</START_TIME>
    <END_TIME>2018-09-04T12:00:00Z</END_TIME>
    <RESOURCE_CAPACITY_USED>1048576</RESOURCE_CAPACITY_USED>
    <LOGICAL_CAPACITY_USED>524288</LOGICAL_CAPACITY_USED>
  </STORAGE>
  <STORAGE>
    <RESOURCE_CAPACITY_USED>7</RESOURCE_CAPACITY_USED>
    <STORAGE_SYSTEM>other</STORAGE_SYSTEM>
    <RECORD_ID>cesnet-storage-2</RECORD_ID>
    <SITE>NULL</SITE>
    <RESOURCE_CAPACITY_ALLOCATED>nil</RESOURCE_CAPACITY_ALLOCATED>
  </STORAGE>
</STORAGES>
"#;

    #[test]
    fn test_decodes_entries_in_order() {
        let batch = storage_records(EXPORT.as_bytes()).unwrap();
        assert_eq!(2, batch.storages.len());

        let first = &batch.storages[0];
        assert_eq!("cesnet-storage-1", first.record_id);
        assert_eq!(
            Utc.with_ymd_and_hms(2018, 9, 4, 12, 0, 0).unwrap(),
            first.create_time
        );
        assert_eq!("du.cesnet.cz", first.storage_system);
        assert_eq!(Some("CESNET"), first.site.as_deref());
        assert_eq!(Some("home"), first.storage_share.as_deref());
        assert_eq!(Some("disk"), first.storage_media.as_deref());
        assert_eq!(None, first.storage_class);
        assert_eq!(Some("42"), first.file_count.as_deref());
        assert_eq!(Some("jdoe"), first.local_user.as_deref());
        assert_eq!(Some("/CN=Jane Doe"), first.user_identity.as_deref());
        assert_eq!(Some("vo.example.org"), first.group.as_deref());
        assert_eq!(
            Utc.with_ymd_and_hms(2018, 9, 3, 12, 0, 0).unwrap(),
            first.start_time
        );
        assert_eq!(1048576, first.resource_capacity_used);
        assert_eq!(Some(524288), first.logical_capacity_used);
        assert_eq!(None, first.resource_capacity_allocated);
    }

    #[test]
    fn test_element_order_unknown_elements_and_sentinels() {
        let batch = storage_records(EXPORT.as_bytes()).unwrap();
        let second = &batch.storages[1];
        assert_eq!("cesnet-storage-2", second.record_id);
        assert_eq!("other", second.storage_system);
        assert_eq!(7, second.resource_capacity_used);
        assert_eq!(None, second.site);
        assert_eq!(None, second.resource_capacity_allocated);
    }

    #[test]
    fn test_empty_root() {
        let batch = storage_records(&b"<STORAGES></STORAGES>"[..]).unwrap();
        assert!(batch.storages.is_empty());
    }

    #[test]
    fn test_wrong_root_is_rejected() {
        let doc = "<?xml version=\"1.0\"?><RECORDS><STORAGE/></RECORDS>";
        match storage_records(doc.as_bytes()) {
            Err(DecodeError::RootElement { expected, found }) => {
                assert_eq!("STORAGES", expected);
                assert_eq!("RECORDS", found);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_no_root_is_rejected() {
        let doc = "<?xml version=\"1.0\"?>\n<!-- nothing here -->\n";
        assert!(matches!(
            storage_records(doc.as_bytes()),
            Err(DecodeError::MissingRoot)
        ));
    }

    #[test]
    fn test_bad_number_rejects_document() {
        let doc = "<STORAGES><STORAGE><LOGICAL_CAPACITY_USED>lots</LOGICAL_CAPACITY_USED></STORAGE></STORAGES>";
        assert!(storage_records(doc.as_bytes()).is_err());
    }

    #[test]
    fn test_unclosed_document_is_rejected() {
        let doc = "<STORAGES><STORAGE><RECORD_ID>x</RECORD_ID>";
        assert!(storage_records(doc.as_bytes()).is_err());
    }
}
