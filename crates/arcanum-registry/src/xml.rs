// SPDX-FileCopyrightText: 2026 Arcanum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! XML descriptor synthesis.
//!
//! Produces the canonical secret descriptor:
//!
//! ```xml
//! <secret ephemeral='no' private='yes'>
//!   <uuid>15dee49c-...</uuid>
//!   <usage type='ceph'>
//!     <name>client.admin</name>
//!   </usage>
//! </secret>
//! ```
//!
//! The secret value is never part of the descriptor, in any state. For a
//! secret marked private, the usage name is withheld unless the caller
//! asks for private fields.

use arcanum_core::{ArcanumError, DescribeOptions, SecretMeta, UsageType};
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

/// Synthesize the XML descriptor for one secret.
pub fn describe(meta: &SecretMeta, opts: DescribeOptions) -> Result<String, ArcanumError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    let mut secret = BytesStart::new("secret");
    secret.push_attribute(("ephemeral", yes_no(meta.ephemeral)));
    secret.push_attribute(("private", yes_no(meta.private)));
    write(&mut writer, Event::Start(secret))?;

    write(&mut writer, Event::Start(BytesStart::new("uuid")))?;
    write(
        &mut writer,
        Event::Text(BytesText::new(&meta.uuid.to_string())),
    )?;
    write(&mut writer, Event::End(BytesEnd::new("uuid")))?;

    if meta.usage_type != UsageType::None {
        let mut usage = BytesStart::new("usage");
        usage.push_attribute(("type", meta.usage_type.to_string().as_str()));

        if meta.private && !opts.include_private {
            // Withhold the usage name for private secrets.
            write(&mut writer, Event::Empty(usage))?;
        } else {
            write(&mut writer, Event::Start(usage))?;
            write(&mut writer, Event::Start(BytesStart::new("name")))?;
            write(&mut writer, Event::Text(BytesText::new(&meta.usage_id)))?;
            write(&mut writer, Event::End(BytesEnd::new("name")))?;
            write(&mut writer, Event::End(BytesEnd::new("usage")))?;
        }
    }

    write(&mut writer, Event::End(BytesEnd::new("secret")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| ArcanumError::Internal(format!("descriptor is not valid UTF-8: {e}")))
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), ArcanumError> {
    writer
        .write_event(event)
        .map_err(|e| ArcanumError::Internal(format!("xml synthesis failed: {e}")))
}
