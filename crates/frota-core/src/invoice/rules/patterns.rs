//! Common regex patterns for NF-e / DANFE text extraction.

use lazy_static::lazy_static;
use regex::Regex;

/// Monetary amount: `1.234,56`, `1234,56`, `1,234.56`, `1234.56` or a bare integer.
const AMOUNT: &str = r"(\d{1,3}(?:\.\d{3})+,\d{2}|\d+,\d{2}|\d{1,3}(?:,\d{3})+\.\d{2}|\d+\.\d{2}|\d+)";

/// Date as printed on a DANFE or in ISO form.
const DATE: &str = r"(\d{1,2}/\d{1,2}/\d{4}|\d{4}-\d{2}-\d{2})";

fn labeled_amount(label: &str) -> Regex {
    Regex::new(&format!(r"(?i){}[\s:]*(?:R\$\s*)?{}", label, AMOUNT)).unwrap()
}

fn labeled_date(label: &str) -> Regex {
    Regex::new(&format!(r"(?i){}[\s:]*{}", label, DATE)).unwrap()
}

lazy_static! {
    // Generic values
    pub static ref AMOUNT_VALUE: Regex = Regex::new(
        r"(\d{1,3}(?:\.\d{3})+,\d{2}|\d+,\d{2}|\d+\.\d{2})\b"
    ).unwrap();

    // Dot-grouped integer such as `1.234` or `12.345.678`
    pub static ref DOT_THOUSANDS: Regex = Regex::new(
        r"^-?[1-9]\d{0,2}(?:\.\d{3})+$"
    ).unwrap();

    pub static ref DATE_DMY: Regex = Regex::new(
        r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b"
    ).unwrap();

    pub static ref DATE_ISO: Regex = Regex::new(
        r"^(\d{4})-(\d{2})-(\d{2})$"
    ).unwrap();

    // CNPJ (14 digits) or CPF (11 digits), punctuated or not
    pub static ref TAX_ID: Regex = Regex::new(
        r"\b(\d{2}\.?\d{3}\.?\d{3}/?\d{4}-?\d{2}|\d{3}\.?\d{3}\.?\d{3}-?\d{2})\b"
    ).unwrap();

    // Document identification
    pub static ref INVOICE_NUMBER: Regex = Regex::new(
        r"\b(?:[Nn][º°]|[Nn][Oo]\.|NO)[ \t]*:?[ \t]*(\d[\d.]*\d|\d)"
    ).unwrap();

    pub static ref INVOICE_NUMBER_LABELED: Regex = Regex::new(
        r"(?i)n[úu]mero\s+(?:da\s+)?(?:nota(?:\s+fiscal)?|nf-?e?)[\s:]*(\d[\d.]*\d|\d)"
    ).unwrap();

    pub static ref SERIES: Regex = Regex::new(
        r"(?i)\bs[ée]rie[\s:]*(\d{1,3})\b"
    ).unwrap();

    pub static ref ACCESS_KEY: Regex = Regex::new(
        r"(?i)chave\s+de\s+acesso[\s:]*((?:\d[ .]?){43}\d)"
    ).unwrap();

    pub static ref AUTHORIZATION_PROTOCOL: Regex = Regex::new(
        r"(?i)protocolo\s+de\s+autoriza[çc][ãa]o(?:\s+de\s+uso)?[\s:]*(\d{15})"
    ).unwrap();

    // Labeled dates
    pub static ref ISSUE_DATE: Regex = labeled_date(r"data\s+(?:de\s+|da\s+)?emiss[ãa]o");

    pub static ref SHIP_DATE: Regex = labeled_date(
        r"data\s+(?:de\s+|da\s+)?(?:sa[íi]da|entrada)(?:\s*/\s*(?:sa[íi]da|entrada))?"
    );

    pub static ref DUE_DATE: Regex = labeled_date(r"(?:data\s+de\s+)?vencimento");

    // Totals
    pub static ref TOTAL_INVOICE: Regex = labeled_amount(r"valor\s+total\s+da\s+nota(?:\s+fiscal)?");
    pub static ref TOTAL_GOODS: Regex = labeled_amount(r"valor\s+total\s+dos\s+produtos");
    pub static ref FREIGHT: Regex = labeled_amount(r"valor\s+do\s+frete");
    pub static ref OTHER_EXPENSES: Regex = labeled_amount(r"outras\s+despesas(?:\s+acess[óo]rias)?");
    pub static ref DISCOUNT: Regex = labeled_amount(r"\bdesconto");
    pub static ref INSURANCE: Regex = labeled_amount(r"valor\s+do\s+seguro");
    pub static ref IPI: Regex = labeled_amount(r"valor\s+(?:total\s+)?do\s+IPI");
    pub static ref ICMS: Regex = labeled_amount(r"valor\s+do\s+ICMS");
    pub static ref ICMS_ST: Regex = labeled_amount(
        r"valor\s+do\s+ICMS\s+(?:subst(?:itui[çc][ãa]o|\.)?|ST)"
    );
    pub static ref ICMS_BASE: Regex = labeled_amount(
        r"base\s+de\s+c[áa]lc(?:ulo|\.)?\s+(?:do\s+)?ICMS"
    );
    pub static ref TOTAL_TAXES: Regex = labeled_amount(
        r"(?:valor\s+(?:aprox(?:imado|\.)?\s+)?(?:total\s+)?dos\s+tributos|tributos\s+totais)"
    );

    // Transported volumes
    pub static ref VOLUME_QUANTITY: Regex = Regex::new(
        r"(?i)(?:quantidade|qtde?\.?)\s+(?:de\s+)?volumes?[\s:]*(\d+)"
    ).unwrap();

    pub static ref VOLUMES: Regex = Regex::new(
        r"(?i)\bvolumes?[ \t]*:[ \t]*(\d+)\b"
    ).unwrap();

    pub static ref VOLUME_KIND: Regex = Regex::new(
        r"(?i)esp[ée]cie[ \t:]+([A-Za-zÀ-ÿ]+)"
    ).unwrap();

    pub static ref VOLUME_MARK: Regex = Regex::new(
        r"(?i)\bmarca[ \t:]+(\S+)"
    ).unwrap();

    pub static ref VOLUME_NUMBERING: Regex = Regex::new(
        r"(?i)numera[çc][ãa]o[ \t:]+(\S+)"
    ).unwrap();

    pub static ref GROSS_WEIGHT: Regex = Regex::new(
        r"(?i)peso\s+bruto[\s:]*(\d[\d.,]*)"
    ).unwrap();

    pub static ref NET_WEIGHT: Regex = Regex::new(
        r"(?i)peso\s+l[íi]quido[\s:]*(\d[\d.,]*)"
    ).unwrap();

    pub static ref NOTES: Regex = Regex::new(
        r"(?is)informa[çc][õo]es\s+complementares[ \t:]*(.+?)(?:\n[ \t]*\n|\z)"
    ).unwrap();

    // Party sections
    // Headers own their line, optionally followed by a colon
    pub static ref SENDER_SECTION: Regex = Regex::new(
        r"(?im)^[ \t]*(?:identifica[çc][ãa]o\s+do\s+)?emitente[ \t]*(?::|\r?$)"
    ).unwrap();

    pub static ref RECIPIENT_SECTION: Regex = Regex::new(
        r"(?im)^[ \t]*destinat[áa]rio(?:[ \t]*/[ \t]*remetente)?[ \t]*(?::|\r?$)"
    ).unwrap();

    pub static ref CARRIER_SECTION: Regex = Regex::new(
        r"(?im)^[ \t]*transportadora?(?:[ \t]*/[ \t]*volumes\s+transportados)?[ \t]*(?::|\r?$)"
    ).unwrap();

    pub static ref RECEIVED_FROM: Regex = Regex::new(
        r"(?i)recebemos\s+de\s+(.+?)\s+os\s+produtos"
    ).unwrap();

    // Party fields, matched inside a section
    pub static ref PARTY_NAME_LABELED: Regex = Regex::new(
        r"(?im)(?:nome\s*/\s*raz[ãa]o\s+social|raz[ãa]o\s+social)[ \t:]*(?:\n[ \t]*)?([^\n]+?)[ \t]*$"
    ).unwrap();

    pub static ref PARTY_NAME_HEADER: Regex = Regex::new(
        r"(?im)^[ \t]*(?:emitente|destinat[áa]rio|transportadora?)[ \t]*:[ \t]*([^\n]+?)[ \t]*$"
    ).unwrap();

    pub static ref PARTY_TAX_ID: Regex = Regex::new(
        r"(?i)(?:CNPJ|CPF)(?:\s*/\s*CPF)?[\s:]*(\d{2}\.?\d{3}\.?\d{3}/?\d{4}-?\d{2}|\d{3}\.?\d{3}\.?\d{3}-?\d{2})"
    ).unwrap();

    pub static ref PARTY_ADDRESS: Regex = Regex::new(
        r"(?im)endere[çc]o[ \t:]*([^\n]+?)[ \t]*$"
    ).unwrap();

    pub static ref PARTY_CITY: Regex = Regex::new(
        r"(?im)munic[íi]pio[ \t:]*([^\n]+?)(?:[ \t]+(?:UF|CEP|FONE)\b[^\n]*)?[ \t]*$"
    ).unwrap();

    pub static ref PARTY_STATE: Regex = Regex::new(
        r"\bUF[ \t:]*([A-Z]{2})\b"
    ).unwrap();

    pub static ref PARTY_POSTAL_CODE: Regex = Regex::new(
        r"(?i)\bCEP[\s:]*(\d{5}-?\d{3}|\d{2}\.\d{3}-\d{3})"
    ).unwrap();

    pub static ref PARTY_PHONE: Regex = Regex::new(
        r"(?i)\b(?:fone|telefone|tel\.?)(?:\s*/\s*fax)?[\s:]*(\(?\d{2}\)?\s*\d{4,5}[-\s]?\d{4})"
    ).unwrap();

    pub static ref PARTY_STATE_REGISTRATION: Regex = Regex::new(
        r"(?i)(?:inscri[çc][ãa]o\s+estadual|\bI\.E\.)[\s:]*(\d[\d./-]*\d|isento)"
    ).unwrap();

    // Installments (duplicatas)
    pub static ref INSTALLMENT_MARKER: Regex = Regex::new(
        r"(?i)\b(?:parcela|duplicata|dup\.)"
    ).unwrap();

    // DANFE product row: code, description, NCM, CST, CFOP, unit, quantity, unit price, total
    pub static ref PRODUCT_ROW: Regex = Regex::new(
        r"(?m)^[ \t]*(\S+)[ \t]+(.+?)[ \t]+(\d{8})[ \t]+(\d{3,4})[ \t]+(\d{4})[ \t]+([A-Za-z]{1,6})[ \t]+(\d[\d.,]*)[ \t]+(\d[\d.,]*)[ \t]+(\d[\d.,]*)[ \t]*$"
    ).unwrap();
}
