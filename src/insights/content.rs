use crate::insights::types::ContentTally;
use crate::model::DeliveryBox;
use std::collections::BTreeMap;

/// Packed versus delivered quantity per item type.
///
/// A box's content counts as delivered once its `validated` stage is
/// recorded, regardless of when.
pub fn content_delivery<'a, I>(boxes: I) -> BTreeMap<String, ContentTally>
where
    I: IntoIterator<Item = &'a DeliveryBox>,
{
    let mut content: BTreeMap<String, ContentTally> = BTreeMap::new();

    for delivery_box in boxes {
        let validated = delivery_box.is_validated();
        for (item, quantity) in &delivery_box.content {
            let tally = content.entry(item.clone()).or_default();
            tally.total = tally.total.saturating_add(*quantity);
            if validated {
                tally.validated = tally.validated.saturating_add(*quantity);
            }
        }
    }

    content
}
