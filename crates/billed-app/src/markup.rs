// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! HTML fragments for the bills pages. Every function is pure; text taken from bills
//! is escaped before it reaches the markup.

use crate::{
    AttachmentPreview, Bill, BillRow, BillStatus, BoardView, CardView, DashboardView, GroupView,
    PageView, PanelView, card_target, display_date, format_amount,
};

const CARD_BACKGROUND: &str = "#0D5AE5";
const CARD_BACKGROUND_SELECTED: &str = "#2A2B35";

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Splits the local part of `first.last@domain` into display names. Without a dot the
/// whole local part is the last name.
pub fn owner_names(email: &str) -> (String, String) {
    let local = email.split('@').next().unwrap_or_default();
    if local.contains('.') {
        let mut parts = local.split('.');
        let first = parts.next().unwrap_or_default().to_owned();
        let last = parts.next().unwrap_or_default().to_owned();
        (first, last)
    } else {
        (String::new(), local.to_owned())
    }
}

pub fn card(bill: &Bill) -> String {
    styled_card(bill, None)
}

pub fn cards(bills: Option<&[Bill]>) -> String {
    bills
        .unwrap_or_default()
        .iter()
        .map(card)
        .collect::<Vec<_>>()
        .join("")
}

fn styled_card(bill: &Bill, background: Option<&str>) -> String {
    let (first_name, last_name) = owner_names(&bill.email);
    let target = escape_html(&card_target(&bill.id));
    let style = background
        .map(|color| format!(" style='background: {color};'"))
        .unwrap_or_default();
    format!(
        "
    <div class='bill-card' id='{target}' data-testid='{target}'{style}>
      <div class='bill-card-name-container'>
        <div class='bill-card-name'> {} {} </div>
        <span class='bill-card-grey'> ... </span>
      </div>
      <div class='name-price-container'>
        <span> {} </span>
        <span> {} € </span>
      </div>
      <div class='date-type-container'>
        <span> {} </span>
        <span> {} </span>
      </div>
    </div>
  ",
        escape_html(&first_name),
        escape_html(&last_name),
        escape_html(&bill.name),
        format_amount(bill.amount),
        escape_html(&display_date(&bill.date)),
        escape_html(&bill.bill_type),
    )
}

fn card_view(card: &CardView) -> String {
    let background = if card.highlighted {
        CARD_BACKGROUND_SELECTED
    } else {
        CARD_BACKGROUND
    };
    styled_card(&card.bill, Some(background))
}

pub fn big_billed_icon() -> String {
    "<div id=\"big-billed-icon\" data-testid=\"big-billed-icon\"> <span class='big-billed-logo'>Billed</span> </div>".to_owned()
}

pub fn loading_page() -> String {
    "<div id=\"loading\">Loading...</div>".to_owned()
}

pub fn error_page(message: &str) -> String {
    format!(
        "<div class='layout'><div class='content'><div class='content-header'><div class='content-title'> Erreur </div></div><div data-testid=\"error-message\">{}</div></div></div>",
        escape_html(message)
    )
}

pub fn dashboard_form(bill: &Bill) -> String {
    let file_url = bill
        .file
        .as_ref()
        .map(|file| file.url.as_str())
        .unwrap_or_default();
    let file_name = bill
        .file
        .as_ref()
        .map(|file| file.name.as_str())
        .unwrap_or_default();

    let review = if bill.status == BillStatus::Pending {
        "
        <div class='form-group'>
          <label for='commentary2'>Ajouter un commentaire</label>
          <textarea id='commentary2' class='form-control' data-testid='commentary2' rows='5'></textarea>
        </div>
        <div class='buttons-flex'>
          <button type='submit' id='btn-refuse-bill' data-testid='btn-refuse-bill' class='btn btn-primary'>Refuser</button>
          <button type='submit' id='btn-accept-bill' data-testid='btn-accept-bill' class='btn btn-primary'>Accepter</button>
        </div>"
            .to_owned()
    } else {
        format!(
            "
        <div class='form-group'>
          <label>Commentaire admin</label>
          <div class='input-field' data-testid='comment-admin'> {} </div>
        </div>",
            escape_html(bill.comment_admin.as_deref().unwrap_or_default())
        )
    };

    format!(
        "
    <div class='container dashboard-form' data-testid='dashboard-form'>
      <div class='row'>
        <div class='col-sm' id='dashboard-form-col1'>
          <label>Email</label><div class='input-field'> {} </div>
          <label>Type de dépense</label><div class='input-field'> {} </div>
          <label>Nom de la dépense</label><div class='input-field'> {} </div>
          <label>Date</label><div class='input-field'> {} </div>
        </div>
        <div class='col-sm' id='dashboard-form-col2'>
          <label>Commentaire</label><div class='textarea-field'> {} </div>
        </div>
      </div>
      <div class='row'>
        <div class='col-sm'>
          <label>Montant TTC</label><div class='input-field'> {} € </div>
          <label>TVA</label><div class='input-field'> {} € ({} %) </div>
        </div>
        <div class='col-sm'>
          <label>Justificatif</label>
          <div class='input-field input-flex file-flex'>
            <span id='file-name-admin'> {} </span>
            <div class='icons-container'>
              <span id='icon-eye-d' data-testid='icon-eye-d' data-bill-url='{}'> 👁 </span>
            </div>
          </div>
        </div>
      </div>
      {review}
    </div>
  ",
        escape_html(&bill.email),
        escape_html(&bill.bill_type),
        escape_html(&bill.name),
        escape_html(&display_date(&bill.date)),
        escape_html(bill.commentary.as_deref().unwrap_or_default()),
        format_amount(bill.amount),
        escape_html(bill.vat.as_deref().unwrap_or_default()),
        bill.pct.unwrap_or(20),
        escape_html(file_name),
        escape_html(file_url),
    )
}

pub fn attachment_modal_body(preview: &AttachmentPreview) -> String {
    format!(
        "<div style='text-align: center;'><img width={} src='{}' alt=\"Bill\"/></div>",
        preview.image_width,
        escape_html(&preview.file_url)
    )
}

fn status_group(group: &GroupView) -> String {
    let index = group.group.index();
    let cards = group.cards.iter().map(card_view).collect::<String>();
    format!(
        "
      <div class='status-bills-header'>
        <h3> {} ({}) </h3>
        <span id='arrow-icon{index}' data-testid='arrow-icon{index}' style='transform: rotate({}deg);'> ▾ </span>
      </div>
      <div id='status-bills-container{index}'>{cards}</div>",
        group.group.title(),
        group.count,
        group.arrow_degrees(),
    )
}

fn board(board: &BoardView) -> String {
    let groups = board.groups.iter().map(status_group).collect::<String>();
    let panel = match &board.panel {
        PanelView::Placeholder => big_billed_icon(),
        PanelView::Detail(bill) => dashboard_form(bill),
    };
    format!(
        "
    <div class='layout'>
      <div class='vertical-navbar' style='height: {};'></div>
      <div class='dashboard-content'>
        <div class='dashboard-left-container'>{groups}
        </div>
        <div class='dashboard-right-container'>
          <div>{panel}</div>
        </div>
      </div>
    </div>",
        board.navbar.css()
    )
}

pub fn dashboard_page(view: &DashboardView) -> String {
    match &view.page {
        PageView::Loading => loading_page(),
        PageView::Error(message) => error_page(message),
        PageView::Board(content) => board(content),
    }
}

fn bill_row(row: &BillRow) -> String {
    let file_url = row
        .bill
        .file
        .as_ref()
        .map(|file| file.url.as_str())
        .unwrap_or_default();
    format!(
        "
      <tr>
        <td>{}</td>
        <td>{}</td>
        <td>{}</td>
        <td>{} €</td>
        <td>{}</td>
        <td><div class='icon-actions'><div id='eye' data-testid='icon-eye' data-bill-url='{}'>👁</div></div></td>
      </tr>",
        escape_html(&row.bill.bill_type),
        escape_html(&row.bill.name),
        escape_html(&row.date_label),
        format_amount(row.bill.amount),
        escape_html(&row.status_label),
        escape_html(file_url),
    )
}

pub fn bills_page(rows: &[BillRow]) -> String {
    let body = rows.iter().map(bill_row).collect::<String>();
    format!(
        "
    <div class='layout'>
      <div class='content'>
        <div class='content-header'>
          <div class='content-title'> Mes notes de frais </div>
          <button type='button' data-testid='btn-new-bill' class='btn btn-primary'>Nouvelle note de frais</button>
        </div>
        <table class='table'>
          <thead><tr><th>Type</th><th>Nom</th><th>Date</th><th>Montant</th><th>Statut</th><th>Actions</th></tr></thead>
          <tbody data-testid='tbody'>{body}
          </tbody>
        </table>
      </div>
    </div>"
    )
}

#[cfg(test)]
mod tests {
    use super::{attachment_modal_body, card, cards, error_page, escape_html, owner_names};
    use crate::{AttachmentPreview, Bill, BillId, BillStatus};

    #[test]
    fn attachment_url_stays_inside_quoted_src() {
        let preview = AttachmentPreview {
            file_url: "https://x.tld/a.jpg' onerror='alert(1)".to_owned(),
            image_width: 400,
        };
        let body = attachment_modal_body(&preview);
        assert!(body.contains(
            "src='https://x.tld/a.jpg&#39; onerror=&#39;alert(1)'"
        ));
        assert!(!body.contains("onerror='"));
    }

    fn bill(email: &str) -> Bill {
        Bill {
            id: BillId::new("47qAXb6fIm2zOKkLzMro"),
            email: email.to_owned(),
            name: "encore".to_owned(),
            bill_type: "Hôtel et logement".to_owned(),
            amount: Some(400.0),
            date: "2004-04-04".to_owned(),
            status: BillStatus::Pending,
            comment_admin: None,
            file: None,
            vat: None,
            pct: None,
            commentary: None,
        }
    }

    #[test]
    fn names_split_on_dot() {
        assert_eq!(owner_names("a.b@x"), ("a".to_owned(), "b".to_owned()));
        assert_eq!(owner_names("a@x"), (String::new(), "a".to_owned()));
        assert_eq!(
            owner_names("jean.pierre.dupont@x"),
            ("jean".to_owned(), "pierre".to_owned())
        );
    }

    #[test]
    fn card_shows_name_amount_date_and_type() {
        let markup = card(&bill("jane.doe@company.tld"));
        assert!(markup.contains("id='open-bill47qAXb6fIm2zOKkLzMro'"));
        assert!(markup.contains("<div class='bill-card-name'> jane doe </div>"));
        assert!(markup.contains("<span> 400 € </span>"));
        assert!(markup.contains("<span> 4 Avr. 04 </span>"));
        assert!(markup.contains("<span> Hôtel et logement </span>"));
    }

    #[test]
    fn cards_concatenate_in_order_and_handle_empty_input() {
        let first = bill("a@a");
        let mut second = bill("b@b");
        second.id = BillId::new("second");
        let both = [first.clone(), second.clone()];

        assert_eq!(cards(Some(&both)), format!("{}{}", card(&first), card(&second)));
        assert_eq!(cards(Some(&[])), "");
        assert_eq!(cards(None), "");
    }

    #[test]
    fn markup_escapes_bill_text() {
        let mut hostile = bill("a@a");
        hostile.name = "<script>".to_owned();
        assert!(card(&hostile).contains("&lt;script&gt;"));
        assert_eq!(escape_html("a'b"), "a&#39;b");
    }

    #[test]
    fn error_page_shows_message_verbatim() {
        assert!(error_page("Erreur 404").contains("Erreur 404"));
    }
}
