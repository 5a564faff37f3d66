//! Target table definitions.
//!
//! The tables are assumed to exist; the specs here drive row validation and
//! the generated column lists of the bulk INSERT statements.

use kingfisher_core::Family;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Inet,
    Int,
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub ty: ColumnType,
    pub not_null: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [ColumnSpec],
}

impl TableSpec {
    pub fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|column| column.name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

const fn text(name: &'static str) -> ColumnSpec {
    ColumnSpec { name, ty: ColumnType::Text, not_null: false }
}

const fn text_nn(name: &'static str) -> ColumnSpec {
    ColumnSpec { name, ty: ColumnType::Text, not_null: true }
}

const fn inet(name: &'static str) -> ColumnSpec {
    ColumnSpec { name, ty: ColumnType::Inet, not_null: false }
}

const fn inet_nn(name: &'static str) -> ColumnSpec {
    ColumnSpec { name, ty: ColumnType::Inet, not_null: true }
}

const fn int(name: &'static str) -> ColumnSpec {
    ColumnSpec { name, ty: ColumnType::Int, not_null: false }
}

/// Failed TACACS authentications.
pub static FTA: TableSpec = TableSpec {
    name: "fta",
    columns: &[
        text_nn("timestamp"),
        text("ipaddress"),
        text("username"),
        text("nasipaddress"),
        text("remoteaddress"),
        text("failurereason"),
        text("networkdevicename"),
        int("requestlatency"),
    ],
};

/// Failed wireless authentications.
pub static FWA: TableSpec = TableSpec {
    name: "fwa",
    columns: &[
        text_nn("timestamp"),
        text("ipaddress"),
        text("username"),
        text("nasipaddress"),
        text("calledstationid"),
        text("failurereason"),
        text("networkdevicename"),
    ],
};

/// Failed LAN authentications.
pub static FLA: TableSpec = TableSpec {
    name: "fla",
    columns: &[
        text_nn("timestamp"),
        text("ipaddress"),
        text("username"),
        text("nasipaddress"),
        text("nasportid"),
        text("failurereason"),
        text("networkdevicename"),
    ],
};

/// Passed wireless authentications.
pub static PWA: TableSpec = TableSpec {
    name: "pwa",
    columns: &[
        text_nn("timestamp"),
        inet("sourceip"),
        inet("nasipaddress"),
        text("networkdevicename"),
        int("requestlatency"),
        text("ciscoavpairmethod"),
        text("username"),
        text("authenticationmethod"),
        text("authenticationidentitystore"),
        text("selectedaccessservice"),
        text("selectedauthorizationprofiles"),
        text("identitygroup"),
        text("selectedauthenticationidentitystores"),
        text("authenticationstatus"),
        text("ndlocation"),
        text("nddevice"),
        text("ndrollout"),
        text("ndreauth"),
        text("ndclosed"),
        text("identitypolicymatchedrule"),
        text("authorizationpolicymatchedrule"),
        text("subjectcommonname"),
        text("endpointmacaddress"),
        text("isepolicysetname"),
        text("adhostresolveddns"),
        int("daystoexpiry"),
        int("sessiontimeout"),
        text("ciscoavpairacs"),
        inet("deviceip"),
        text("calledstationid"),
        text("radiusflowtype"),
    ],
};

/// Passed LAN authentications.
pub static PLA: TableSpec = TableSpec {
    name: "pla",
    columns: &[
        text_nn("timestamp"),
        inet("sourceip"),
        inet("nasipaddress"),
        text("nasportid"),
        text("networkdevicename"),
        int("requestlatency"),
        text("ciscoavpairmethod"),
        text("username"),
        text("authenticationmethod"),
        text("authenticationidentitystore"),
        text("selectedaccessservice"),
        text("selectedauthorizationprofiles"),
        text("identitygroup"),
        text("selectedauthenticationidentitystores"),
        text("authenticationstatus"),
        text("ndlocation"),
        text("nddevice"),
        text("ndrollout"),
        text("ndreauth"),
        text("ndclosed"),
        text("identitypolicymatchedrule"),
        text("authorizationpolicymatchedrule"),
        text("subjectcommonname"),
        text("endpointmacaddress"),
        text("isepolicysetname"),
        text("adhostresolveddns"),
        int("daystoexpiry"),
        int("sessiontimeout"),
        text("ciscoavpairacs"),
        inet("deviceip"),
    ],
};

/// TACACS command accounting.
pub static TCA: TableSpec = TableSpec {
    name: "tca",
    columns: &[
        text_nn("timestamp"),
        text_nn("username"),
        text_nn("networkdevicename"),
        inet_nn("networkdeviceip"),
        inet("remotedevice"),
        text_nn("cmdset"),
        inet("ipaddress"),
    ],
};

pub fn spec_for(family: Family) -> &'static TableSpec {
    match family {
        Family::Fta => &FTA,
        Family::Fwa => &FWA,
        Family::Fla => &FLA,
        Family::Pwa => &PWA,
        Family::Pla => &PLA,
        Family::Tca => &TCA,
    }
}
